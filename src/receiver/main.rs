use lambda_http::{run, service_fn, Error, Request};
use tracing::info;

use slack_feedback_receiver::config::Config;
use slack_feedback_receiver::handler::{function_handler, App};

#[tokio::main]
async fn main() -> Result<(), Error> {
    slack_feedback_receiver::init_tracing();

    let config = Config::from_env()?;
    info!("Starting with {:?}", config);
    let app = App::new(config);
    let app = &app;

    run(service_fn(move |event: Request| async move {
        function_handler(event, app).await
    }))
    .await
}
