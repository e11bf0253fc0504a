#[tokio::main]
async fn main() -> anyhow::Result<()> {
    invoice_parser_server::start().await
}
