use chrono::Utc;
use pagegrid_common::{
    BatchOperation, BatchRequest, Block, BlockId, BlockPatch, GridRect, PageStore, StoreError,
};
use pagegrid_server::{router, HttpPageStore, MemoryPageStore};
use serde_json::{json, Map};
use std::sync::Arc;

/// Serve `store` on an ephemeral port and return a client for it
async fn serve(store: Arc<MemoryPageStore>) -> HttpPageStore {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(store)).await.unwrap();
    });
    HttpPageStore::new(format!("http://{}", addr)).unwrap()
}

fn store_with_page() -> Arc<MemoryPageStore> {
    let store = Arc::new(MemoryPageStore::new());
    store.create_page(1, 12).unwrap();
    store
}

#[tokio::test]
async fn test_fetch_page_over_http() {
    let client = serve(store_with_page()).await;
    let page = client.fetch_page(1).await.unwrap();
    assert_eq!(page.page_id, 1);
    assert_eq!(page.rows, 12);
}

#[tokio::test]
async fn test_missing_page_maps_to_not_found() {
    let client = serve(store_with_page()).await;
    assert!(matches!(
        client.fetch_page(42).await,
        Err(StoreError::PageNotFound(42))
    ));
}

#[tokio::test]
async fn test_batch_over_http() {
    let store = store_with_page();
    let client = serve(store.clone()).await;

    let mut block = Block::new(
        BlockId::from("temp_h"),
        1,
        "Heading",
        GridRect::new(0, 0, 4, 1),
        json!({"text": "Hello"}),
        Utc::now(),
    );
    block.background_color = Some("red".to_string());

    let created = client
        .apply_batch(
            1,
            BatchRequest {
                operations: vec![BatchOperation::create(&block, 1).unwrap()],
                rows: 12,
                settings: Map::new(),
            },
        )
        .await
        .unwrap();
    let id = created.id_mapping()[&BlockId::from("temp_h")].clone();

    let cleared = client
        .apply_batch(
            1,
            BatchRequest {
                operations: vec![BatchOperation::update(
                    id.clone(),
                    BlockPatch {
                        background_color: Some(None),
                        ..Default::default()
                    },
                    2,
                )
                .unwrap()],
                rows: 12,
                settings: Map::new(),
            },
        )
        .await
        .unwrap();
    assert!(cleared.success);
    assert_eq!(cleared.operations_processed, 1);

    let page = store.fetch_page(1).await.unwrap();
    assert_eq!(page.blocks[0].id, id);
    assert_eq!(page.blocks[0].background_color, None);
}

#[tokio::test]
async fn test_batch_for_missing_page_maps_to_not_found() {
    let client = serve(store_with_page()).await;
    let result = client
        .apply_batch(
            9,
            BatchRequest {
                operations: Vec::new(),
                rows: 10,
                settings: Map::new(),
            },
        )
        .await;
    assert!(matches!(result, Err(StoreError::PageNotFound(9))));
}

#[tokio::test]
async fn test_unreachable_store_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpPageStore::new(format!("http://{}", addr)).unwrap();
    assert!(matches!(
        client.fetch_page(1).await,
        Err(StoreError::Transport(_))
    ));
}
