use std::sync::Arc;

use hyrank_service::HyrankService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<HyrankService>,
}
impl AppState {
	/// Connects the embedder and the vector store described by `config`.
	pub fn new(config: hyrank_config::Config) -> color_eyre::Result<Self> {
		let service = HyrankService::new(config)?;

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: HyrankService) -> Self {
		Self { service: Arc::new(service) }
	}
}
