use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = hyrank_api::Args::parse();

	hyrank_api::run(args).await
}
