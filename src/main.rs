use eyre::Report;
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::EnvFilter;

use floatchat::app::{self, App};
use floatchat::core::catalog;
use floatchat::core::chat::ChatClient;
use floatchat::events::app_event::AppEvent;
use floatchat::overlay::{self, OverlayFrame};

#[tokio::main]
async fn main() -> Result<(), Report> {
    // Setup file-based logging
    let file_appender = tracing_appender::rolling::never(".", "floatchat.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(non_blocking)
        .init();

    let config = app::config::load().await?;
    tracing::info!("Starting overlay for channel: {}", config.channel);

    let (frames_tx, _) = broadcast::channel(config.max_messages.max(1));
    let (event_tx, mut event_rx) = mpsc::channel(64);

    let hello = OverlayFrame::Hello {
        message_text_color: config.message_text_color.clone(),
    };
    let listen_addr = config.listen_addr.clone();
    let overlay_frames = frames_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = overlay::serve(listen_addr, hello, overlay_frames).await {
            tracing::error!("Overlay server failed: {}", e);
        }
    });

    // Fire-and-forget: a failed load degrades to text-only rendering of
    // third-party emote codes.
    let channel = config.channel.clone();
    let providers = config.providers.clone();
    let catalog_tx = event_tx.clone();
    tokio::spawn(async move {
        let result = catalog::fetch_emotes(&channel, &providers)
            .await
            .map_err(|e| e.to_string());
        let _ = catalog_tx.send(AppEvent::CatalogLoaded(result)).await;
    });

    let chat = ChatClient::new(config.channel.clone(), event_tx.clone());
    tokio::spawn(chat.run());
    drop(event_tx);

    let mut app = App::new(config, frames_tx);
    while let Some(event) = event_rx.recv().await {
        app.handle_event(event);
    }

    Ok(())
}
