//! Prints status changes of a deployment through the callback API.

use backboard_subscriptions::{operations::DeploymentStatus, Endpoint};

#[tokio::main]
async fn main() {
    let deployment_id = demos::required_arg("deployment-id");

    // Dropping the handle would cancel the subscription straight away
    let (_handle, cancellation) = backboard_subscriptions::cancellation();

    let result = backboard_subscriptions::subscribe(
        &Endpoint::from_env(),
        DeploymentStatus::new(deployment_id),
        cancellation,
        |update| {
            println!("{}: {}", update.id, update.status);
        },
        |error| eprintln!("{error}"),
    )
    .await;

    if let Err(error) = result {
        eprintln!("subscription ended: {error}");
        std::process::exit(1);
    }
}
