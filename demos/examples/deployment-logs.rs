//! Tails the logs of a deployment until the server completes the stream or
//! Ctrl-C is pressed.
//!
//! Reads credentials from `RAILWAY_TOKEN` or `RAILWAY_API_TOKEN`:
//!
//! ```sh
//! RAILWAY_TOKEN=... cargo run --example deployment-logs -- <deployment-id>
//! ```

use backboard_subscriptions::{operations::DeploymentLogs, Endpoint, Error, SubscriptionBuilder};
use futures_lite::StreamExt;

#[tokio::main]
async fn main() {
    let deployment_id = demos::required_arg("deployment-id");

    let (handle, cancellation) = backboard_subscriptions::cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let mut logs = match SubscriptionBuilder::new()
        .cancellation(cancellation)
        .connect(&Endpoint::from_env(), DeploymentLogs::new(deployment_id).limit(500))
        .await
    {
        Ok(logs) => logs,
        Err(error) => {
            eprintln!("couldn't subscribe: {error}");
            std::process::exit(1);
        }
    };

    while let Some(item) = logs.next().await {
        match item {
            Ok(lines) => {
                for line in lines {
                    println!("{}", demos::format_line(&line));
                }
            }
            Err(Error::Cancelled) => break,
            Err(error) => eprintln!("{error}"),
        }
    }
}
