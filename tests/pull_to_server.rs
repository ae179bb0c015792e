// Full pull run against a mocked feed host and a live ingest server.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use news_relay::api::{self, AppState};
use news_relay::config::{ClientConfig, FeedCatalog};
use news_relay::db::{self, Repository};
use news_relay::models::NewsFilter;
use news_relay::pipeline::Pipeline;
use news_relay::services::DeliveryCache;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rss(pub_date: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Varzesh</title>
    <link>https://varzesh.test</link>
    <description>Sport</description>
    <item>
      <title> Final &amp; whistle </title>
      <link>https://varzesh.test/news/1</link>
      <description>&lt;p&gt;Match   report&lt;/p&gt;</description>
      <enclosure url="https://varzesh.test/1.jpg" type="image/jpeg" length="1"/>
      <pubDate>{pub_date}</pubDate>
    </item>
    <item>
      <title>Old story</title>
      <link>https://varzesh.test/news/old</link>
      <pubDate>Mon, 01 Jan 2001 00:00:00 +0000</pubDate>
    </item>
  </channel>
</rss>"#
    )
}

async fn start_server(catalog: &FeedCatalog) -> (String, Arc<Repository>) {
    let repo = Repository::in_memory().await.expect("open db");
    db::seed_catalog(&repo, catalog).await.expect("seed");
    let repo = Arc::new(repo);
    let state = AppState {
        repo: repo.clone(),
        api_key: Some("secret".into()),
        require_api_key: true,
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, api::router(state)).await.ok();
    });
    (format!("http://{addr}/api/news"), repo)
}

#[tokio::test]
async fn two_runs_deliver_each_fresh_item_once() {
    let feeds = MockServer::start().await;
    let fresh = (Utc::now() - ChronoDuration::minutes(5)).to_rfc2822();
    Mock::given(method("GET"))
        .and(path("/sport.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss(&fresh)))
        .mount(&feeds)
        .await;

    let catalog = FeedCatalog::parse(&format!(
        r#"
        [[categories]]
        id = 4
        name = "Sport"

        [[categories.feeds]]
        url = "{}/sport.xml"
        agency = "Varzesh"
        agency_id = 9
        "#,
        feeds.uri()
    ))
    .expect("catalog");

    let (api_url, repo) = start_server(&catalog).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let cache_path = dir.path().join("posted_links.json");

    let config = ClientConfig {
        api_url,
        api_key: Some("secret".into()),
        delivery_delay_ms: 0,
        cache_path: cache_path.to_string_lossy().to_string(),
        ..ClientConfig::default()
    };
    let pipeline = Pipeline::new(config).expect("pipeline");
    let sources = catalog.sources();

    let first = pipeline.run(&sources).await;
    assert_eq!(first.fetched, 1);
    assert_eq!(first.delivered, 1);

    let second = pipeline.run(&sources).await;
    assert_eq!(second.fetched, 1);
    assert_eq!(second.already_delivered, 1);
    assert_eq!(second.attempted, 0);

    let (total, news) = repo.list_news(NewsFilter::default()).await.expect("list");
    assert_eq!(total, 1);
    let stored = &news[0];
    assert_eq!(stored.title, "Final & whistle");
    assert_eq!(stored.content, "Match report");
    assert_eq!(stored.image_url.as_deref(), Some("https://varzesh.test/1.jpg"));
    assert_eq!(stored.link.as_deref(), Some("https://varzesh.test/news/1"));
    assert_eq!(stored.category.name, "Sport");
    assert_eq!(stored.agency.id, 9);

    let cache = DeliveryCache::load(&cache_path);
    assert!(cache.contains("https://varzesh.test/news/1"));
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn rejected_items_stay_out_of_the_cache() {
    let feeds = MockServer::start().await;
    let fresh = (Utc::now() - ChronoDuration::minutes(1)).to_rfc2822();
    Mock::given(method("GET"))
        .and(path("/sport.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss(&fresh)))
        .mount(&feeds)
        .await;

    let catalog = FeedCatalog::parse(&format!(
        r#"
        [[categories]]
        id = 4
        name = "Sport"

        [[categories.feeds]]
        url = "{}/sport.xml"
        agency = "Varzesh"
        agency_id = 9
        "#,
        feeds.uri()
    ))
    .expect("catalog");

    let (api_url, repo) = start_server(&catalog).await;
    let dir = tempfile::tempdir().expect("tempdir");
    let cache_path = dir.path().join("posted_links.json");

    let config = ClientConfig {
        api_url,
        api_key: Some("wrong".into()),
        delivery_delay_ms: 0,
        cache_path: cache_path.to_string_lossy().to_string(),
        ..ClientConfig::default()
    };
    let summary = Pipeline::new(config)
        .expect("pipeline")
        .run(&catalog.sources())
        .await;
    assert_eq!(summary.attempted, 1);
    assert_eq!(summary.delivered, 0);

    let (total, _) = repo.list_news(NewsFilter::default()).await.expect("list");
    assert_eq!(total, 0);
    assert!(DeliveryCache::load(&cache_path).is_empty());
}
