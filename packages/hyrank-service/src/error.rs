pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The request is missing a field or carries an unusable value. `field` is a JSON path.
	#[error("Invalid request: {message}")]
	InvalidRequest { field: String, message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Vector store error: {message}")]
	VectorStore { message: String },
	#[error("Deadline exceeded: {message}")]
	DeadlineExceeded { message: String },
}
impl Error {
	pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
		Self::InvalidRequest { field: field.to_string(), message: message.into() }
	}
}
impl From<hyrank_providers::Error> for Error {
	fn from(err: hyrank_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
impl From<hyrank_storage::Error> for Error {
	fn from(err: hyrank_storage::Error) -> Self {
		Self::VectorStore { message: err.to_string() }
	}
}
