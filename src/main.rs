use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod decorations;
mod document_links;
mod error;
mod events;
mod goto;
mod hover;
mod link_resolve;
mod protocol;
mod scanner;
mod server;
mod state;
mod text;
mod visibility;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(server::CommentLinkerServer::new)
        .custom_method(
            protocol::SELECTION_CHANGED,
            server::CommentLinkerServer::selection_changed,
        )
        .custom_method(
            protocol::ACTIVE_DOCUMENT_CHANGED,
            server::CommentLinkerServer::active_document_changed,
        )
        .finish();
    Server::new(stdin, stdout, socket).serve(service).await;
}
