//! Connect to a Core host, load a hand skeleton and print streamed joints.
//!
//! Usage: cargo run --example minimal_client [--features vendor-sdk]
//! Without `vendor-sdk` a simulated host on localhost is used.
//! Press Ctrl+C to stop.

use coresdk::keypoints::{hand_keypoints, to_canonical};
use coresdk::{Client, ClientConfig, CoreSdk, SkeletonFrame};

const PRINT_EVERY: u64 = 30;

fn main() {
    env_logger::init();
    let config = ClientConfig::from_env();

    #[cfg(feature = "vendor-sdk")]
    let result = match coresdk::VendorCore::acquire() {
        Some(sdk) => run(sdk, config),
        None => {
            eprintln!("Vendor SDK already in use");
            std::process::exit(1);
        }
    };

    #[cfg(not(feature = "vendor-sdk"))]
    let result = {
        log::warn!("built without vendor-sdk, using a simulated host");
        let sdk = coresdk::SimulatedCore::new()
            .with_host(coresdk::Host::new("localhost", "127.0.0.1"));
        run(sdk, config)
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run<S: CoreSdk>(sdk: S, config: ClientConfig) -> coresdk::Result<()> {
    let mut client = Client::new(sdk, config);
    client.initialize()?;
    if let Some(dir) = client.documents_dir() {
        println!("Documents: {}", dir.display());
    }

    println!("Looking for hosts...");
    let host = client.connect()?;
    println!(
        "Connected to {} ({}), Core {}.{}.{}",
        host.host_name,
        host.ip_address,
        host.core_version.major,
        host.core_version.minor,
        host.core_version.patch
    );

    client.setup_skeletons()?;
    let hand = client.hand_skeleton();
    match hand {
        Some(id) => println!("Hand skeleton loaded as {}", id.0),
        None => println!("Streaming without a hand skeleton"),
    }

    println!("Streaming (Ctrl+C to stop)...");
    let mut count: u64 = 0;
    client.run(|frame: &SkeletonFrame| {
        count += 1;
        if count % PRINT_EVERY != 1 {
            return;
        }
        println!("t={:<12}  skeletons={}", frame.publish_time.0, frame.skeletons.len());
        for skeleton in &frame.skeletons {
            println!("  skeleton {}: {} nodes", skeleton.info.id, skeleton.nodes.len());
            for node in &skeleton.nodes {
                let p = node.transform.position;
                println!("    joint {:>2}: [{:+.4}, {:+.4}, {:+.4}]", node.id, p.x, p.y, p.z);
            }
            if hand.map(|id| id.0) != Some(skeleton.info.id) {
                continue;
            }
            let Some(points) = hand_keypoints(skeleton).and_then(|p| to_canonical(&p)) else {
                continue;
            };
            println!("  palm frame:");
            for (i, p) in points.iter().enumerate() {
                println!("    {:>2}: [{:+.4}, {:+.4}, {:+.4}]", i, p.x, p.y, p.z);
            }
        }
    })?;

    println!("\nTotal: {} frames", count);
    client.shut_down()
}
