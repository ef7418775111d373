mod common;

use common::{FakeServer, NdbProbe, filters};
use pretty_assertions::assert_eq;
use sift_core::{InstanceCache, Version};
use sift_filter::Filters;
use sift_runtime::{BuildError, InstanceCacheBuilder, SessionError};

async fn structural(server: &mut FakeServer, filters: Filters) -> InstanceCache {
    InstanceCacheBuilder::new(server, filters)
        .await
        .unwrap()
        .build()
}

async fn full(server: &mut FakeServer, filters: Filters) -> InstanceCache {
    InstanceCacheBuilder::new(server, filters)
        .await
        .unwrap()
        .metadata()
        .await
        .unwrap()
        .events()
        .await
        .unwrap()
        .routines()
        .await
        .unwrap()
        .triggers()
        .await
        .unwrap()
        .users()
        .await
        .unwrap()
        .build()
}

fn schema_names(cache: &InstanceCache) -> Vec<&str> {
    cache.schemas.keys().map(String::as_str).collect()
}

#[tokio::test]
async fn test_server_identity() {
    let mut server = FakeServer::sample();
    server.gtid_executed = "3e11fa47-71ca-11e1-9e33-c80aa9429562:1-5".into();
    let cache = structural(&mut server, Filters::default()).await;

    assert_eq!(cache.server.user, "root@%");
    assert_eq!(cache.server.hostname, "db-host");
    assert_eq!(cache.server.address, "db.test:3306");
    assert_eq!(cache.server.version, Version::new(8, 0, 36));
    assert_eq!(
        cache.server.gtid_executed.as_deref(),
        Some("3e11fa47-71ca-11e1-9e33-c80aa9429562:1-5")
    );
    assert!(!cache.server.is_ndb);
    let local = gethostname::gethostname().into_string().unwrap();
    let expected = if local.is_empty() { "localhost" } else { local.as_str() };
    assert_eq!(cache.server.local_hostname, expected);
}

#[tokio::test]
async fn test_empty_gtid_is_none() {
    let mut server = FakeServer::sample();
    let cache = structural(&mut server, Filters::default()).await;
    assert_eq!(cache.server.gtid_executed, None);
}

#[tokio::test]
async fn test_ndb_detected() {
    let mut server = FakeServer::sample();
    server.ndb = NdbProbe::Present;
    let cache = structural(&mut server, Filters::default()).await;
    assert!(cache.server.is_ndb);
}

#[tokio::test]
async fn test_failed_ndb_probe_is_not_fatal() {
    let mut server = FakeServer::sample().failing_on("ndbinfo");
    server.ndb = NdbProbe::Fails;
    let cache = structural(&mut server, Filters::default()).await;
    assert!(!cache.server.is_ndb);
    assert_eq!(cache.filtered.schemas, 4);
}

#[tokio::test]
async fn test_failed_listing_is_fatal() {
    let mut server = FakeServer::sample().failing_on("information_schema.schemata");
    let result = InstanceCacheBuilder::new(&mut server, Filters::default()).await;
    assert!(matches!(
        result.err(),
        Some(BuildError::Session(SessionError::Statement { .. }))
    ));
}

#[tokio::test]
async fn test_failed_metadata_stage_is_fatal() {
    let mut server = FakeServer::sample().failing_on("information_schema.statistics");
    let builder = InstanceCacheBuilder::new(&mut server, Filters::default())
        .await
        .unwrap();
    assert!(builder.metadata().await.is_err());
}

#[tokio::test]
async fn test_structural_stage_without_filters() {
    let mut server = FakeServer::sample();
    let cache = structural(&mut server, Filters::default()).await;

    assert_eq!(schema_names(&cache), vec!["first", "mysql", "second", "third"]);
    let first = cache.schema("first").unwrap();
    assert_eq!(first.tables.keys().collect::<Vec<_>>(), vec!["one", "two"]);
    assert_eq!(first.views.keys().collect::<Vec<_>>(), vec!["one_view"]);

    // names only until the metadata stage runs
    assert!(cache.table("first", "one").unwrap().all_columns.is_empty());

    assert_eq!(cache.total.schemas, 4);
    assert_eq!(cache.total.tables, 6);
    assert_eq!(cache.total.views, 1);
    assert_eq!(cache.filtered.tables, 6);
    assert_eq!(cache.filtered.views, 1);
}

#[tokio::test]
async fn test_schema_exclude_beats_table_include() {
    let mut server = FakeServer::sample();
    let filters = filters(|o| {
        o.schemas_mut().include("third").unwrap();
        o.tables_mut().include("third.two").unwrap();
        o.schemas_mut().exclude("third").unwrap();
    });
    let cache = structural(&mut server, filters).await;

    assert!(cache.schema("third").is_none());
    assert!(cache.schemas.is_empty());
    assert_eq!(cache.filtered.tables, 0);
}

#[tokio::test]
async fn test_table_include_limits_schemas() {
    let mut server = FakeServer::sample();
    let filters = filters(|o| o.tables_mut().include("first.one").unwrap());
    let cache = structural(&mut server, filters).await;

    assert_eq!(schema_names(&cache), vec!["first"]);
    let first = cache.schema("first").unwrap();
    assert_eq!(first.tables.keys().collect::<Vec<_>>(), vec!["one"]);
    assert!(first.views.is_empty());
    assert_eq!(cache.filtered.schemas, 1);
    assert_eq!(cache.filtered.tables, 1);
}

#[tokio::test]
async fn test_views_follow_table_filter() {
    let mut server = FakeServer::sample();
    let filters = filters(|o| o.tables_mut().exclude("first.one_view").unwrap());
    let cache = structural(&mut server, filters).await;

    assert!(cache.view("first", "one_view").is_none());
    assert_eq!(cache.filtered.views, 0);
    assert_eq!(cache.total.views, 1);
}

#[tokio::test]
async fn test_metadata_stage() {
    let mut server = FakeServer::sample();
    let cache = InstanceCacheBuilder::new(&mut server, Filters::default())
        .await
        .unwrap()
        .metadata()
        .await
        .unwrap()
        .build();

    assert!(server.ran("SET SESSION information_schema_stats_expiry = 0"));

    let first = cache.schema("first").unwrap();
    assert_eq!(first.collation, "utf8mb4_0900_ai_ci");

    let one = cache.table("first", "one").unwrap();
    assert_eq!(one.engine, "InnoDB");
    assert_eq!(one.row_count, 10);
    assert_eq!(one.average_row_length, 0);
    assert_eq!(one.all_columns.len(), 3);
    assert_eq!(
        one.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["id", "name"]
    );
    assert!(one.all_columns[2].generated);
    assert_eq!(one.primary_key.as_ref().unwrap().columns_sql(), "`id`");
    assert_eq!(one.histograms.len(), 1);
    assert_eq!(one.histograms[0].buckets, 64);

    let two = cache.table("first", "two").unwrap();
    assert!(two.primary_key.is_none());
    assert_eq!(
        two.primary_key_equivalents
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>(),
        vec!["code"]
    );
    // the functional index is dropped, the nullable one kept apart
    assert_eq!(
        two.unique_keys
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>(),
        vec!["tag"]
    );

    let view = cache.view("first", "one_view").unwrap();
    assert_eq!(view.character_set_client, "utf8mb4");
    assert_eq!(view.collation_connection, "utf8mb4_0900_ai_ci");
    assert_eq!(view.all_columns.len(), 2);
}

#[tokio::test]
async fn test_metadata_on_old_server_skips_version_gated_queries() {
    let mut server = FakeServer::sample().with_version("5.7.44-log");
    let cache = InstanceCacheBuilder::new(&mut server, Filters::default())
        .await
        .unwrap()
        .metadata()
        .await
        .unwrap()
        .build();

    assert!(!server.ran("information_schema_stats_expiry"));
    assert!(!server.ran("information_schema.column_statistics"));
    assert!(cache.table("first", "one").unwrap().histograms.is_empty());
    assert_eq!(cache.server.version, Version::new(5, 7, 44));
}

#[tokio::test]
async fn test_unrequested_stages_have_zero_counts() {
    let mut server = FakeServer::sample();
    let cache = InstanceCacheBuilder::new(&mut server, Filters::default())
        .await
        .unwrap()
        .metadata()
        .await
        .unwrap()
        .build();

    for stats in [cache.total, cache.filtered] {
        assert_eq!(stats.events, 0);
        assert_eq!(stats.routines, 0);
        assert_eq!(stats.triggers, 0);
        assert_eq!(stats.users, 0);
    }
    assert!(!server.ran("information_schema.events"));
    assert!(!server.ran("mysql.user"));
}

#[tokio::test]
async fn test_object_sub_stages() {
    let mut server = FakeServer::sample();
    let filters = filters(|o| {
        o.schemas_mut().exclude("third").unwrap();
        o.tables_mut().exclude("second.one").unwrap();
        o.routines_mut().exclude("first.calc").unwrap();
        o.triggers_mut().exclude("first.one.after_ins").unwrap();
        o.users_mut().exclude("'mysql.sys'@'localhost'").unwrap();
    });
    let cache = full(&mut server, filters).await;

    let first = cache.schema("first").unwrap();
    assert_eq!(first.events.iter().collect::<Vec<_>>(), vec!["nightly"]);
    assert_eq!(
        cache.schema("second").unwrap().events.iter().collect::<Vec<_>>(),
        vec!["hourly"]
    );
    assert_eq!(cache.filtered.events, 2);
    assert_eq!(cache.total.events, 2);

    // routine names compare case-insensitively
    assert!(first.functions.is_empty());
    assert_eq!(first.procedures.iter().collect::<Vec<_>>(), vec!["load"]);
    assert_eq!(cache.filtered.routines, 1);
    assert_eq!(cache.total.routines, 3);

    assert_eq!(
        cache.table("first", "one").unwrap().triggers,
        vec!["before_ins".to_string()]
    );
    assert_eq!(
        cache.table("first", "two").unwrap().triggers,
        vec!["audit".to_string()]
    );
    assert_eq!(cache.filtered.triggers, 2);
    assert_eq!(cache.total.triggers, 4);

    assert_eq!(cache.users.len(), 3);
    assert_eq!(cache.filtered.users, 3);
    assert_eq!(cache.total.users, 4);
}

#[tokio::test]
async fn test_filtered_counts_never_exceed_totals() {
    let configurations: Vec<Filters> = vec![
        Filters::default(),
        filters(|o| o.schemas_mut().include_all(["first", "second"]).unwrap()),
        filters(|o| o.tables_mut().include_all(["first.one", "third.two"]).unwrap()),
        filters(|o| {
            o.schemas_mut().exclude("first").unwrap();
            o.events_mut().include("first.nightly").unwrap();
            o.triggers_mut().include("first.one").unwrap();
        }),
        filters(|o| {
            o.users_mut().include("app").unwrap();
            o.routines_mut().include("third.CALC").unwrap();
        }),
    ];

    for filters in configurations {
        let mut server = FakeServer::sample();
        let cache = full(&mut server, filters).await;
        assert!(
            cache.filtered.bounded_by(&cache.total),
            "filtered {:?} exceeds total {:?}",
            cache.filtered,
            cache.total
        );
    }
}

#[tokio::test]
async fn test_deferred_metadata_stage_matches_single_pass() {
    let filters = filters(|o| {
        o.schemas_mut().exclude("mysql").unwrap();
        o.triggers_mut().exclude("first.two.audit").unwrap();
    });

    let mut server = FakeServer::sample();
    let single_pass = full(&mut server, filters.clone()).await;

    let mut server = FakeServer::sample();
    let structural_only = structural(&mut server, filters.clone()).await;

    let mut server = FakeServer::sample();
    let deferred = InstanceCacheBuilder::from_cache(&mut server, filters, structural_only)
        .metadata()
        .await
        .unwrap()
        .events()
        .await
        .unwrap()
        .routines()
        .await
        .unwrap()
        .triggers()
        .await
        .unwrap()
        .users()
        .await
        .unwrap()
        .build();

    assert_eq!(single_pass, deferred);
    // no structural query runs on the resumed build
    assert!(!server.ran("CURRENT_USER()"));
}

fn sent(server: &FakeServer, catalog: &str, fragment: &str) -> bool {
    server
        .queries
        .iter()
        .any(|q| q.contains(&format!("FROM {catalog} ")) && q.contains(fragment))
}

fn schema_is(column: &str, schema: &str) -> String {
    format!("STRCMP(CONVERT({column} USING utf8mb4) COLLATE utf8mb4_bin, '{schema}') = 0")
}

#[tokio::test]
async fn test_predicates_use_catalog_columns() {
    let mut server = FakeServer::sample();
    let filters = filters(|o| {
        o.schemas_mut().include("first").unwrap();
        o.tables_mut().include("first.one").unwrap();
        o.triggers_mut().include("first.one.before_ins").unwrap();
    });
    full(&mut server, filters).await;

    assert!(sent(&server, "information_schema.schemata", &schema_is("SCHEMA_NAME", "first")));
    for catalog in [
        "information_schema.tables",
        "information_schema.columns",
        "information_schema.statistics",
        "information_schema.views",
    ] {
        assert!(sent(&server, catalog, &schema_is("TABLE_SCHEMA", "first")), "{catalog}");
        assert!(sent(&server, catalog, "TABLE_NAME IN ('one')"), "{catalog}");
    }

    let histograms = "information_schema.column_statistics";
    assert!(sent(&server, histograms, &schema_is("SCHEMA_NAME", "first")));
    assert!(!sent(&server, histograms, "TABLE_SCHEMA"));

    assert!(sent(&server, "information_schema.events", &schema_is("EVENT_SCHEMA", "first")));
    assert!(sent(&server, "information_schema.routines", &schema_is("ROUTINE_SCHEMA", "first")));

    let triggers = "information_schema.triggers";
    assert!(sent(&server, triggers, &schema_is("TRIGGER_SCHEMA", "first")));
    assert!(sent(&server, triggers, "EVENT_OBJECT_TABLE IN ('one')"));
    assert!(sent(&server, triggers, "TRIGGER_NAME IN ('before_ins')"));
}
