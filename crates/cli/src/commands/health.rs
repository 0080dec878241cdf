use delaysqs_aws::SqsQueue;

pub async fn run(queue: &SqsQueue) -> anyhow::Result<()> {
    match queue.health_check().await {
        Ok(visible) => {
            println!(
                "Queue {} is reachable ({visible} visible message(s)).",
                queue.queue_url()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed to reach queue: {e}");
            std::process::exit(1);
        }
    }
}
