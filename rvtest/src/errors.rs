use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error when accessing {0}")]
    IoError(#[from] std::io::Error),
    #[error("Error parsing toolchain configuration {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Error writing JUnit report {0}")]
    XmlError(#[from] quick_xml::Error),
    #[error("Error walking test directory {0}")]
    WalkError(#[from] walkdir::Error),
    #[error("The path `{0}` does not exist")]
    FileNotFoundError(String),
    #[error("Not a valid test case `{0}`")]
    InvalidTestCase(String),
    #[error("Building the compiler-under-test failed: {0}")]
    BuildFailure(String),
    #[error("{0}")]
    IllegalArguments(String),
}

pub type Result<T> = std::result::Result<T, Error>;
