use std::collections::BTreeSet;

use ip_topology::{
    DeviceId, TopologyError, TopologyService,
    acquisition::{core::FetchError, snapshot::InterfaceSnapshot},
    config::TopologyConfig,
    network::device::RawInterface,
    topology::{
        BuildStatus, adjacency, neighbors, query::NeighborsResult, query::PathResult, segment,
        shortest_path, summary,
    },
};

fn id(name: &str) -> DeviceId {
    DeviceId::from(name)
}

fn service(snapshot: InterfaceSnapshot, fail_fast: bool) -> TopologyService {
    let config = TopologyConfig {
        fail_fast,
        ..TopologyConfig::default()
    };
    TopologyService::new(snapshot.clone(), snapshot, config)
}

/// A and B share a /30, C only has a stub network.
fn three_devices() -> InterfaceSnapshot {
    InterfaceSnapshot::new()
        .with_interfaces(
            "A",
            vec![
                RawInterface::new("Gi0/0/0/0", "10.0.0.1/30"),
                RawInterface::new("MgmtEth0/RP0/CPU0/0", "172.20.20.11/24"),
            ],
        )
        .with_interfaces(
            "B",
            vec![
                RawInterface::new("Gi0/0/0/0", "10.0.0.2/30"),
                RawInterface::new("MgmtEth0/RP0/CPU0/0", "172.20.20.12/24"),
            ],
        )
        .with_interfaces(
            "C",
            vec![
                RawInterface::new("Gi0/0/0/1", "10.9.9.1/30"),
                RawInterface::unnumbered("Gi0/0/0/2"),
                RawInterface::new("MgmtEth0/RP0/CPU0/0", "172.20.20.13/24"),
            ],
        )
}

#[tokio::test]
async fn two_linked_devices_and_one_stub() {
    let result = service(three_devices(), false).build().await.unwrap();

    assert_eq!(result.status(), BuildStatus::Complete);
    assert_eq!(result.graph().node_count(), 3);
    assert_eq!(result.graph().link_count(), 1);

    let of_b = neighbors(&result, &id("B")).unwrap();
    let names: Vec<&DeviceId> = of_b.neighbors().iter().map(|n| &n.neighbor).collect();
    assert_eq!(names, vec![&id("A")]);
    assert_eq!(of_b.neighbors()[0].link.network.to_string(), "10.0.0.0/30");

    assert!(neighbors(&result, &id("C")).unwrap().is_isolated());
    assert_eq!(
        shortest_path(&result, &id("A"), &id("C")).unwrap(),
        PathResult::NotFound
    );

    let path = shortest_path(&result, &id("B"), &id("A")).unwrap();
    assert_eq!(path.path().unwrap().nodes, vec![id("B"), id("A")]);

    let expected: BTreeSet<DeviceId> = [id("A"), id("B")].into_iter().collect();
    assert_eq!(segment(&result, "10.0.0.0/30").unwrap(), expected);
    assert_eq!(segment(&result, "10.0.0.2/255.255.255.252").unwrap(), expected);
    // management subnets and stubs carry no link
    assert!(segment(&result, "172.20.20.0/24").unwrap().is_empty());
    assert!(segment(&result, "10.9.9.0/30").unwrap().is_empty());

    let connections = adjacency(&result).unwrap();
    assert_eq!(connections.len(), 1);
    assert_eq!((connections[0].source, connections[0].target), (&id("A"), &id("B")));
}

#[tokio::test]
async fn failing_device_degrades_the_build() {
    let snapshot = three_devices()
        .with_error("D", FetchError::Transport("GRPC ERROR Host: 172.20.20.14:57400".into()));
    let result = service(snapshot, false).build().await.unwrap();

    assert_eq!(result.status(), BuildStatus::Degraded);
    assert_eq!(result.error_devices(), &[id("D")][..]);
    assert!(result.graph().contains(&id("A")));
    assert!(result.graph().contains(&id("B")));
    assert!(!result.graph().contains(&id("D")));
    assert_eq!(
        neighbors(&result, &id("D")).unwrap(),
        NeighborsResult::NotInTopology
    );
    assert!(summary(&result).possibly_incomplete);
}

#[tokio::test]
async fn fail_fast_aborts_the_whole_build() {
    let snapshot = InterfaceSnapshot::new()
        .with_interfaces("A", vec![RawInterface::new("eth0", "10.0.0.1/30")])
        .with_interfaces("B", vec![RawInterface::new("eth0", "10.0.0.2/30")])
        .with_error("D", FetchError::Auth("invalid credentials".into()));
    let result = service(snapshot, true).build().await.unwrap();

    assert!(result.is_failed());
    assert!(result.graph().is_empty());
    let failure = result.failure().unwrap();
    assert_eq!(failure.device, id("D"));
    assert!(matches!(
        neighbors(&result, &id("A")),
        Err(TopologyError::BuildFailed(e)) if e.device == id("D")
    ));
}

#[tokio::test]
async fn feature_absent_devices_are_neither_nodes_nor_errors() {
    let snapshot = three_devices().with_error(
        "E",
        FetchError::FeatureNotConfigured {
            feature: "openconfig-interfaces".into(),
            message: "Feature not available".into(),
        },
    );
    let result = service(snapshot, true).build().await.unwrap();

    assert_eq!(result.status(), BuildStatus::Complete);
    assert!(!result.has_errors());
    assert!(!result.graph().contains(&id("E")));
    assert_eq!(result.total_devices(), 4);
}

#[tokio::test]
async fn every_successful_device_becomes_a_node() {
    for k in [1usize, 5, 23] {
        let snapshot = (0..k).fold(InterfaceSnapshot::new(), |snapshot, i| {
            snapshot.with_interfaces(format!("R{i}"), vec![])
        });
        let result = service(snapshot, false).build_topology(4).await.unwrap();
        assert_eq!(result.graph().node_count(), k);
        assert_eq!(result.graph().link_count(), 0);
        assert_eq!(summary(&result).graph.isolated_nodes, k);
    }
}

#[tokio::test]
async fn chain_paths_follow_links_hop_by_hop() {
    let snapshot = InterfaceSnapshot::new()
        .with_interfaces("A", vec![RawInterface::new("eth0", "10.0.0.1/30")])
        .with_interfaces(
            "B",
            vec![
                RawInterface::new("eth0", "10.0.0.2/30"),
                RawInterface::new("eth1", "10.0.0.5/30"),
            ],
        )
        .with_interfaces("C", vec![RawInterface::new("eth0", "10.0.0.6/30")]);
    let result = service(snapshot, false).build().await.unwrap();

    let path = shortest_path(&result, &id("A"), &id("C")).unwrap();
    let path = path.path().unwrap();
    assert_eq!(path.nodes, vec![id("A"), id("B"), id("C")]);
    assert_eq!(path.hop_count(), 2);
    assert_eq!(path.edges[1].network.to_string(), "10.0.0.4/30");

    let same = shortest_path(&result, &id("B"), &id("B")).unwrap();
    assert_eq!(same.path().unwrap().nodes, vec![id("B")]);
    assert_eq!(summary(&result).graph.components, 1);
}
