use std::{sync::Arc, time::Duration};

use cloudsyncd::{service::Op, storage::fs::LocalDir, Service};

use crate::{
    dataset::{self, Entry},
    harness::{Harness, PERIOD},
    stubs::{clock, remote::Call},
    utils,
};

fn upload(name: &str, overwrite: bool) -> Call {
    Call::Upload {
        name: name.to_string(),
        overwrite,
    }
}

fn delete(name: &str) -> Call {
    Call::Delete {
        name: name.to_string(),
    }
}

#[tokio::test]
async fn mixed_folder_scenario() {
    let harness = Harness::new(dataset::LOCAL, dataset::CLOUD).await;

    let report = harness.service.cycle().await.unwrap();

    assert_eq!(report.uploaded, vec!["a.txt"]);
    assert_eq!(report.overwritten, vec!["b.txt"]);
    assert_eq!(report.deleted, vec!["d.txt"]);
    assert!(report.skipped.is_empty());
    assert!(report.failed.is_empty());

    assert_eq!(
        harness.remote.mutations(),
        vec![upload("a.txt", false), upload("b.txt", true), delete("d.txt")]
    );
    assert!(harness.remote.calls().contains(&Call::RequestUpload {
        name: "b.txt".to_string(),
        overwrite: true
    }));

    assert_eq!(harness.remote.names(), vec!["a.txt", "b.txt", "c.txt"]);
    assert_eq!(harness.remote.content("a.txt").unwrap(), "a - local only");
    assert_eq!(harness.remote.content("b.txt").unwrap(), "b - local newer");
    assert_eq!(harness.remote.content("c.txt").unwrap(), "c - cloud newer");
}

#[tokio::test]
async fn second_cycle_is_idle() {
    let harness = Harness::new(dataset::LOCAL, dataset::CLOUD).await;

    let first = harness.service.cycle().await.unwrap();
    assert_eq!(first.mutations(), 3);
    harness.remote.clear_calls();

    let second = harness.service.cycle().await.unwrap();
    assert_eq!(second.mutations(), 0);
    assert!(second.skipped.is_empty() && second.failed.is_empty());
    assert_eq!(harness.remote.calls(), vec![Call::List]);
}

#[tokio::test]
async fn equal_timestamps_are_left_alone() {
    let harness = Harness::new(dataset::IN_SYNC, dataset::IN_SYNC).await;

    let report = harness.service.cycle().await.unwrap();

    assert_eq!(report.mutations(), 0);
    assert!(harness.remote.mutations().is_empty());
}

#[tokio::test]
async fn local_change_is_overwritten_next_cycle() {
    let harness = Harness::new(dataset::IN_SYNC, dataset::IN_SYNC).await;
    harness.service.cycle().await.unwrap();

    // newer than the reference, older than now
    let mtime = harness.mtime(-60);
    harness.local.write("same.txt", "edited", mtime).await;

    let report = harness.service.cycle().await.unwrap();
    assert_eq!(report.overwritten, vec!["same.txt"]);
    assert_eq!(harness.remote.mutations(), vec![upload("same.txt", true)]);
    assert_eq!(harness.remote.content("same.txt").unwrap(), "edited");
}

#[tokio::test]
async fn local_delete_is_propagated() {
    let harness = Harness::new(dataset::IN_SYNC, dataset::IN_SYNC).await;
    harness.local.remove("other.txt").await;

    let report = harness.service.cycle().await.unwrap();
    assert_eq!(report.deleted, vec!["other.txt"]);
    assert_eq!(harness.remote.names(), vec!["same.txt"]);
}

#[tokio::test]
async fn failed_upload_does_not_block_others() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry{name: "a.txt", content: "a", age: 0},
        Entry{name: "b.txt", content: "b", age: 0},
        Entry{name: "c.txt", content: "c", age: 0},
    ];
    #[rustfmt::skip]
    const CLOUD: &[Entry] = &[
        Entry{name: "x.txt", content: "x", age: 0},
        Entry{name: "y.txt", content: "y", age: 0},
    ];
    let harness = Harness::new(LOCAL, CLOUD).await;
    harness.remote.fail_upload_of("b.txt");
    harness.remote.fail_delete_of("x.txt");

    let report = harness.service.cycle().await.unwrap();

    assert_eq!(report.uploaded, vec!["a.txt", "c.txt"]);
    assert_eq!(report.deleted, vec!["y.txt"]);
    assert_eq!(report.failed.len(), 2);
    assert_eq!(report.failed[0].0, Op::Upload);
    assert_eq!(report.failed[0].1, "b.txt");
    assert!(report.failed[0].2.is_api());
    assert_eq!(report.failed[1].0, Op::Delete);
    assert_eq!(report.failed[1].1, "x.txt");

    assert_eq!(harness.remote.names(), vec!["a.txt", "c.txt", "x.txt"]);
}

#[tokio::test]
async fn file_vanishing_before_upload_is_local_error() {
    let harness = Harness::new(dataset::LOCAL, &[]).await;
    let root = harness.local.root().to_owned();
    harness.remote.before_upload(move |name| {
        if name == "b.txt" {
            std::fs::remove_file(root.join(name)).unwrap();
        }
    });

    let report = harness.service.cycle().await.unwrap();

    assert_eq!(report.uploaded, vec!["a.txt", "c.txt"]);
    assert_eq!(report.failed.len(), 1);
    let (op, name, err) = &report.failed[0];
    assert_eq!((*op, name.as_str()), (Op::Upload, "b.txt"));
    assert!(err.is_io(), "{err}");

    // next cycle sees the folder without b.txt
    harness.remote.clear_calls();
    let report = harness.service.cycle().await.unwrap();
    assert_eq!(report.mutations(), 0);
}

#[tokio::test]
async fn upload_is_skipped_when_object_appears() {
    let harness = Harness::new(dataset::LOCAL, &[]).await;
    let remote = harness.remote.clone();
    let mtime = utils::cloud_time(harness.reference);
    // another client creates b.txt after the listing
    harness.remote.before_upload(move |name| {
        if name == "a.txt" {
            remote.insert("b.txt", "from another client", mtime);
        }
    });

    let report = harness.service.cycle().await.unwrap();

    assert_eq!(report.uploaded, vec!["a.txt", "c.txt"]);
    assert_eq!(report.skipped, vec![(Op::Upload, "b.txt".to_string())]);
    assert!(report.failed.is_empty());
    assert!(harness.remote.calls().contains(&Call::RequestUpload {
        name: "b.txt".to_string(),
        overwrite: false
    }));
    assert!(!harness.remote.mutations().contains(&upload("b.txt", false)));
    assert_eq!(
        harness.remote.content("b.txt").unwrap(),
        "from another client"
    );
}

#[tokio::test]
async fn already_deleted_object_is_not_an_error() {
    #[rustfmt::skip]
    const LOCAL: &[Entry] = &[
        Entry{name: "new.txt", content: "new", age: 0},
    ];
    #[rustfmt::skip]
    const CLOUD: &[Entry] = &[
        Entry{name: "gone.txt", content: "gone", age: 0},
    ];
    let harness = Harness::new(LOCAL, CLOUD).await;
    let remote = harness.remote.clone();
    // another client deletes gone.txt after the listing
    harness.remote.before_upload(move |_| remote.remove("gone.txt"));

    let report = harness.service.cycle().await.unwrap();

    assert_eq!(report.uploaded, vec!["new.txt"]);
    assert_eq!(report.deleted, vec!["gone.txt"]);
    assert!(report.failed.is_empty());
    assert_eq!(harness.remote.names(), vec!["new.txt"]);
}

#[tokio::test]
async fn listing_failure_aborts_cycle_only() {
    let harness = Harness::new(dataset::LOCAL, dataset::CLOUD).await;
    harness.remote.fail_listing(true);

    let err = harness.service.cycle().await.unwrap_err();
    assert!(err.is_api(), "{err}");
    assert!(harness.remote.mutations().is_empty());
    assert_eq!(harness.remote.calls(), vec![Call::List]);

    let clock = clock::Stub::new(usize::MAX);
    let report = harness.service.tick(&clock).await;
    assert!(report.is_none());
    assert_eq!(clock.sleeps(), 1);
    assert!(harness.remote.mutations().is_empty());

    harness.remote.fail_listing(false);
    let report = harness.service.tick(&clock).await.unwrap();
    assert_eq!(report.mutations(), 3);
    assert_eq!(clock.sleeps(), 2);
    assert_eq!(clock.intervals(), vec![PERIOD]);
}

#[tokio::test]
async fn missing_local_folder_aborts_cycle_only() {
    let harness = Harness::new(dataset::LOCAL, dataset::CLOUD).await;
    std::fs::remove_dir_all(harness.local.root()).unwrap();

    let err = harness.service.cycle().await.unwrap_err();
    assert!(err.is_io(), "{err}");
    assert!(harness.remote.mutations().is_empty());

    let clock = clock::Stub::new(usize::MAX);
    assert!(harness.service.tick(&clock).await.is_none());
    assert_eq!(clock.sleeps(), 1);
}

#[tokio::test]
async fn loop_keeps_running_through_failures() {
    let harness = Harness::new(dataset::LOCAL, dataset::CLOUD).await;
    harness.remote.fail_listing(true);

    let clock = Arc::new(clock::Stub::new(4));
    let service = harness.service.clone();
    let remote = harness.remote.clone();
    let run_clock = clock.clone();

    let run = tokio::spawn(async move { service.run(run_clock.as_ref()).await });

    // heal the remote after the first sleep, the loop must pick it up
    while clock.sleeps() < 1 {
        tokio::task::yield_now().await;
    }
    remote.fail_listing(false);

    clock.exhausted().await;
    assert!(!run.is_finished());
    run.abort();

    assert_eq!(clock.sleeps(), 4);
    assert_eq!(clock.intervals(), vec![PERIOD, PERIOD, PERIOD]);

    let lists = harness
        .remote
        .calls()
        .into_iter()
        .filter(|c| *c == Call::List)
        .count();
    assert_eq!(lists, 4);
    assert_eq!(
        harness.remote.mutations(),
        vec![upload("a.txt", false), upload("b.txt", true), delete("d.txt")]
    );
}

#[tokio::test]
async fn zero_period_is_config_error() {
    let harness = Harness::new(&[], &[]).await;
    let local = LocalDir::new(harness.local.root()).unwrap();

    let err = Service::new(local, harness.remote.clone(), Duration::ZERO)
        .err()
        .unwrap();
    assert!(err.is_config(), "{err}");
}
