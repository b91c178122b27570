use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use assert_matches::assert_matches;
use harness_config::{HarnessConfig, NodeName};
use pretty_assertions::assert_eq;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use crate::images::{
    artifacts_for,
    build_images,
    remove_tarballs,
    BuildOutcome,
    BuildReport,
    Freshness,
    ImageArtifact,
    ImageError,
};
use crate::runtime::MockContainerRuntime;

const HOUR: Duration = Duration::from_secs(3600);

fn touch(path: &Path, modified: SystemTime) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let file = File::options().create(true).truncate(false).write(true).open(path).unwrap();
    file.set_modified(modified).unwrap();
}

/// A workspace with one Dockerfile and one runner source per image, all an hour old.
struct Workspace {
    dir: TempDir,
    config: HarnessConfig,
}

impl Workspace {
    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    let an_hour_ago = SystemTime::now() - HOUR;
    let mut config = HarnessConfig {
        artifacts_dir: dir.path().join("images"),
        health_gate_dockerfile: dir.path().join("docker/health_gate.Dockerfile"),
        health_gate_prerequisites: vec![],
        ..Default::default()
    };
    touch(&config.health_gate_dockerfile, an_hour_ago);
    for (node, node_config) in config.nodes.iter_mut() {
        node_config.dockerfile = dir.path().join(format!("docker/{node}.Dockerfile"));
        node_config.prerequisites = vec![dir.path().join("runner")];
        touch(&node_config.dockerfile, an_hour_ago);
    }
    touch(&dir.path().join("runner/main.rs"), an_hour_ago);
    Workspace { dir, config }
}

fn expect_builds(runtime: &mut MockContainerRuntime, tag: &'static str) {
    runtime
        .expect_build_image()
        .withf(move |built, _, _| built == tag)
        .times(1)
        .returning(|_, _, _| Ok(()));
    runtime.expect_save_image().withf(move |saved, _| saved == tag).times(1).returning(
        |_, tarball| {
            fs::write(tarball, b"image").unwrap();
            Ok(())
        },
    );
}

#[rstest]
fn freshness_follows_modification_times(workspace: Workspace) {
    let artifact = ImageArtifact::for_node(&workspace.config, NodeName::Madara).unwrap();
    assert_eq!(artifact.freshness().unwrap(), Freshness::Missing);

    touch(&artifact.tarball, SystemTime::now());
    assert_eq!(artifact.freshness().unwrap(), Freshness::Fresh);

    // A file deep inside a directory prerequisite counts.
    touch(&workspace.path("runner/args.rs"), SystemTime::now() + HOUR);
    assert_eq!(
        artifact.freshness().unwrap(),
        Freshness::Stale { newer: vec![workspace.path("runner")] }
    );

    touch(&artifact.dockerfile, SystemTime::now() + HOUR);
    assert_eq!(
        artifact.freshness().unwrap(),
        Freshness::Stale { newer: vec![artifact.dockerfile.clone(), workspace.path("runner")] }
    );
}

#[rstest]
fn missing_prerequisite_is_an_error(workspace: Workspace) {
    let artifact = ImageArtifact::for_node(&workspace.config, NodeName::Juno).unwrap();
    fs::remove_file(&artifact.dockerfile).unwrap();

    assert_matches!(
        artifact.freshness(),
        Err(ImageError::MissingPrerequisite { image, path })
            if image == "juno" && path == artifact.dockerfile
    );
}

#[rstest]
fn gated_nodes_need_the_health_gate_image(workspace: Workspace) {
    let names = |nodes: &[NodeName]| {
        artifacts_for(&workspace.config, nodes)
            .unwrap()
            .into_iter()
            .map(|artifact| artifact.name)
            .collect::<Vec<_>>()
    };

    assert_eq!(names(&[NodeName::Madara]), vec!["madara"]);
    assert_eq!(names(&[NodeName::Juno, NodeName::Pathfinder]), vec![
        "juno",
        "pathfinder",
        "health_gate"
    ]);
}

#[rstest]
#[tokio::test]
async fn builds_only_when_stale(workspace: Workspace) {
    let mut runtime = MockContainerRuntime::new();
    expect_builds(&mut runtime, "starknet-harness/madara:latest");

    let first = build_images(&runtime, &workspace.config, &[NodeName::Madara], false).await.unwrap();
    assert_eq!(first, vec![BuildReport { image: "madara".into(), outcome: BuildOutcome::Built }]);
    runtime.checkpoint();

    // Nothing changed and the engine still holds the image: no build.
    runtime
        .expect_image_exists()
        .withf(|tag| tag == "starknet-harness/madara:latest")
        .times(1)
        .returning(|_| Ok(true));
    let second =
        build_images(&runtime, &workspace.config, &[NodeName::Madara], false).await.unwrap();
    assert_eq!(second, vec![BuildReport {
        image: "madara".into(),
        outcome: BuildOutcome::UpToDate
    }]);
    runtime.checkpoint();

    touch(&workspace.path("docker/madara.Dockerfile"), SystemTime::now() + HOUR);
    expect_builds(&mut runtime, "starknet-harness/madara:latest");
    let third = build_images(&runtime, &workspace.config, &[NodeName::Madara], false).await.unwrap();
    assert_eq!(third[0].outcome, BuildOutcome::Built);
}

#[rstest]
#[tokio::test]
async fn fresh_tarball_is_loaded_when_engine_lacks_the_image(workspace: Workspace) {
    let artifact = ImageArtifact::for_node(&workspace.config, NodeName::Madara).unwrap();
    touch(&artifact.tarball, SystemTime::now());

    let mut runtime = MockContainerRuntime::new();
    runtime.expect_image_exists().times(1).returning(|_| Ok(false));
    let tarball = artifact.tarball.clone();
    runtime
        .expect_load_image()
        .withf(move |loaded| loaded == tarball)
        .times(1)
        .returning(|_| Ok(()));
    runtime.expect_build_image().never();
    runtime.expect_save_image().never();

    let reports =
        build_images(&runtime, &workspace.config, &[NodeName::Madara], false).await.unwrap();

    assert_eq!(reports, vec![BuildReport {
        image: "madara".into(),
        outcome: BuildOutcome::Loaded
    }]);
}

#[rstest]
#[tokio::test]
async fn force_rebuilds_fresh_images(workspace: Workspace) {
    let artifact = ImageArtifact::for_node(&workspace.config, NodeName::Pathfinder).unwrap();
    let health_gate = ImageArtifact::health_gate(&workspace.config);
    touch(&artifact.tarball, SystemTime::now());
    touch(&health_gate.tarball, SystemTime::now());

    let mut runtime = MockContainerRuntime::new();
    expect_builds(&mut runtime, "starknet-harness/pathfinder:latest");
    expect_builds(&mut runtime, "starknet-harness/health_gate:latest");

    let reports =
        build_images(&runtime, &workspace.config, &[NodeName::Pathfinder], true).await.unwrap();

    assert!(reports.iter().all(|report| report.outcome == BuildOutcome::Built));
}

#[rstest]
fn remove_tarballs_skips_missing(workspace: Workspace) {
    let artifacts = artifacts_for(&workspace.config, &[NodeName::Madara, NodeName::Juno]).unwrap();
    touch(&artifacts[1].tarball, SystemTime::now());

    let removed = remove_tarballs(&artifacts).unwrap();

    assert_eq!(removed, vec![artifacts[1].tarball.clone()]);
    assert!(!artifacts[1].tarball.exists());
}
