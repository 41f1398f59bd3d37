//! Full runs: configuration → provider → worker pool → manifest.

mod common;

use std::sync::Arc;

use cluster_getter::config::loader::load_config_with_env;
use cluster_getter::config::RuntimeConfig;
use cluster_getter::provider::{ConfigProvider, SharePolicy};
use cluster_getter::worker::{BuilderOptions, ManifestTask, ParsedManifest, PoolReport, WorkerPool};

use common::CountingSource;

async fn run(
    policy: SharePolicy,
    options: BuilderOptions,
    manifest: &str,
    workers: usize,
) -> (Arc<CountingSource>, ConfigProvider, PoolReport<ParsedManifest>) {
    run_with(&common::stub_config(), policy, options, manifest, workers).await
}

async fn run_with(
    config: &RuntimeConfig,
    policy: SharePolicy,
    options: BuilderOptions,
    manifest: &str,
    workers: usize,
) -> (Arc<CountingSource>, ConfigProvider, PoolReport<ParsedManifest>) {
    let file = common::manifest_file(manifest);
    let source = Arc::new(CountingSource::new(config));
    let provider = ConfigProvider::from_source(source.clone(), policy);

    let task = ManifestTask::new(file.path(), options);
    let report = WorkerPool::new(workers)
        .run(&provider, move |ctx| {
            let task = task.clone();
            async move { task.run(ctx).await }
        })
        .await;
    (source, provider, report)
}

fn descriptors(report: &PoolReport<ParsedManifest>) -> Vec<&Arc<cluster_getter::ConnectionDescriptor>> {
    report.successes().map(|(_, parsed)| &parsed.descriptor).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shared_run_parses_everything_with_one_build() {
    let (source, provider, report) = run(
        SharePolicy::ShareByReference,
        BuilderOptions::default(),
        common::MANIFEST,
        2,
    )
    .await;

    assert!(report.is_success(), "{}", report);
    assert_eq!(report.outcomes.len(), 2);
    for (_, parsed) in report.successes() {
        let kinds: Vec<_> = parsed.infos.iter().map(|info| info.kind.as_str()).collect();
        assert_eq!(kinds, ["ConfigMap", "Deployment", "Service"]);
        assert_eq!(parsed.infos[0].namespace.as_deref(), Some("apps"));
        assert_eq!(parsed.infos[1].namespace.as_deref(), Some("prod"));
    }
    assert_eq!(source.descriptor_builds(), 1);
    assert_eq!(provider.build_count(), 1);

    let descriptors = descriptors(&report);
    assert!(Arc::ptr_eq(descriptors[0], descriptors[1]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cloned_run_matches_but_hands_out_distinct_instances() {
    let (source, provider, report) = run(
        SharePolicy::CloneOnRead,
        BuilderOptions::default(),
        common::MANIFEST,
        2,
    )
    .await;

    assert!(report.is_success(), "{}", report);
    assert!(report.successes().all(|(_, parsed)| parsed.infos.len() == 3));
    assert_eq!(source.descriptor_builds(), 1);
    assert_eq!(provider.build_count(), 1);

    let descriptors = descriptors(&report);
    assert!(!Arc::ptr_eq(descriptors[0], descriptors[1]));
    assert_eq!(*descriptors[0], *descriptors[1]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_normalizing_workers_stay_clean_on_copies() {
    let options = BuilderOptions {
        normalize_mapping: true,
        ..BuilderOptions::default()
    };
    let (_, provider, report) = run(SharePolicy::CloneOnRead, options, common::MANIFEST, 4).await;

    assert!(report.is_success(), "{}", report);

    // Worker copies were stamped; the cached descriptor was not
    let cached = provider.connection_descriptor().await.unwrap();
    assert_eq!(cached.client_defaults().group_version, None);
    for (_, parsed) in report.successes() {
        assert_eq!(parsed.descriptor.client_defaults().group_version.as_deref(), Some("v1"));
    }
}

fn normalizing() -> BuilderOptions {
    BuilderOptions {
        normalize_mapping: true,
        ..BuilderOptions::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_normalizing_workers_race_on_shared_state() {
    let config = common::unnormalized_config();
    let (source, provider, report) = run_with(
        &config,
        SharePolicy::ShareByReference,
        normalizing(),
        common::MANIFEST,
        4,
    )
    .await;

    // Only the first mutator can come out clean, and only if nobody overlapped it
    assert!(report.failure_count() >= 3, "{}", report);
    assert!(report.failures().all(|(_, error)| error.is_race()), "{}", report);
    assert_eq!(source.descriptor_builds(), 1);

    let mapping = provider.type_mapping().await.unwrap();
    let widget = mapping.resolve("example.io/v1", "Widget").unwrap();
    assert_eq!(widget.resource, "widgets");
    assert_eq!(widget.versions, ["v1", "v2"]);
    assert!(mapping.race_detector().races() >= 3);
    assert!(mapping.race_detector().owner().is_some());

    let descriptor = provider.connection_descriptor().await.unwrap();
    assert!(descriptor.race_detector().races() >= 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_two_normalizing_workers_always_race_when_shared() {
    for _ in 0..20 {
        let (_, _, report) = run(
            SharePolicy::ShareByReference,
            normalizing(),
            common::MANIFEST,
            2,
        )
        .await;
        assert!(report.failure_count() >= 1, "{}", report);
        assert!(report.failures().all(|(_, error)| error.is_race()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_normalizing_workers_on_copies_leave_cache_untouched() {
    let config = common::unnormalized_config();
    let (_, provider, report) = run_with(
        &config,
        SharePolicy::CloneOnRead,
        normalizing(),
        common::MANIFEST,
        4,
    )
    .await;

    assert!(report.is_success(), "{}", report);
    for (_, parsed) in report.successes() {
        let widget = parsed.mapping.resolve("example.io/v1", "Widget").unwrap();
        assert_eq!(widget.resource, "widgets");
    }

    let cached = provider.type_mapping().await.unwrap();
    let widget = cached.resolve("example.io/v1", "Widget").unwrap();
    assert_eq!(widget.resource, "Widgets");
    assert_eq!(widget.versions, ["v2", "v1"]);
    assert_eq!(cached.race_detector().owner(), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_uncached_workers_each_build_their_own_state() {
    let config = common::unnormalized_config();
    let file = common::manifest_file(common::MANIFEST);
    let source = Arc::new(CountingSource::new(&config));
    let provider = ConfigProvider::uncached_from_source(source.clone());

    let task = ManifestTask::new(file.path(), normalizing());
    let report = WorkerPool::new(3)
        .run(&provider, move |ctx| {
            let task = task.clone();
            async move { task.run(ctx).await }
        })
        .await;

    assert!(report.is_success(), "{}", report);
    // One build per descriptor read and one per mapping read
    assert_eq!(provider.build_count(), 6);
    assert_eq!(source.descriptor_builds(), 6);
    assert!(!provider.is_built());

    let descriptors = descriptors(&report);
    assert!(!Arc::ptr_eq(descriptors[0], descriptors[1]));
    for (_, parsed) in report.successes() {
        assert_eq!(parsed.infos.len(), 3);
        assert_eq!(parsed.mapping.race_detector().races(), 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bad_manifest_fails_every_worker_independently() {
    let manifest = format!("{}---\napiVersion: v1\nkind: Gadget\nmetadata:\n  name: g\n", common::MANIFEST);
    let options = BuilderOptions {
        continue_on_error: true,
        ..BuilderOptions::default()
    };
    let (_, provider, report) = run(SharePolicy::ShareByReference, options, &manifest, 3).await;

    assert_eq!(report.failure_count(), 3);
    assert!(report.to_string().starts_with("3 workers: 0 succeeded, 3 failed"));
    assert!(report.first_error().unwrap().to_string().contains("Gadget"));
    assert_eq!(provider.build_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_from_configuration_file() {
    let mut config_file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(
        &mut config_file,
        br#"
[cluster]
server = "https://cluster.test:6443"
namespace = "staging"

[workers]
parallelism = 3
policy = "clone_on_read"
"#,
    )
    .unwrap();

    let config = load_config_with_env(Some(config_file.path()), |key| {
        (key == "CLUSTER_TOKEN").then(|| "from-env".to_string())
    })
    .unwrap();
    assert_eq!(config.cluster.token.as_deref(), Some("from-env"));

    let source = CountingSource::new(&config);
    let provider = ConfigProvider::new(source, config.workers.policy);
    let file = common::manifest_file(common::MANIFEST);
    let task = ManifestTask::new(file.path(), BuilderOptions::default());

    let report = WorkerPool::new(config.workers.parallelism)
        .run(&provider, move |ctx| {
            let task = task.clone();
            async move { task.run(ctx).await }
        })
        .await;

    assert!(report.is_success(), "{}", report);
    assert_eq!(report.outcomes.len(), 3);
    let (_, parsed) = report.successes().next().unwrap();
    assert_eq!(parsed.infos[0].namespace.as_deref(), Some("staging"));
    assert_eq!(provider.policy(), SharePolicy::CloneOnRead);
}
