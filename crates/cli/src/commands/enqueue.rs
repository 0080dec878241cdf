use clap::Args;
use delaysqs_core::now_epoch_seconds;
use delaysqs_delayer::Delayer;

#[derive(Args, Debug)]
pub struct EnqueueArgs {
    /// Payload to deliver (string or @file path).
    pub payload: String,
    /// Delivery time in epoch seconds.
    #[arg(long, conflicts_with = "in_seconds", required_unless_present = "in_seconds")]
    pub at: Option<i64>,
    /// Delivery time relative to now, in seconds.
    #[arg(long = "in", id = "in_seconds")]
    pub in_seconds: Option<i64>,
}

impl EnqueueArgs {
    fn deliver_at(&self) -> i64 {
        match (self.at, self.in_seconds) {
            (Some(at), _) => at,
            (None, Some(offset)) => now_epoch_seconds().saturating_add(offset),
            (None, None) => now_epoch_seconds(),
        }
    }

    fn payload(&self) -> anyhow::Result<String> {
        match self.payload.strip_prefix('@') {
            Some(path) => Ok(std::fs::read_to_string(path)?),
            None => Ok(self.payload.clone()),
        }
    }
}

pub async fn run(delayer: &Delayer, args: &EnqueueArgs) -> anyhow::Result<()> {
    let receipt = delayer.enqueue(args.payload()?, args.deliver_at()).await?;
    match receipt.message_id {
        Some(id) => println!("{id}"),
        None => println!("delivered immediately"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: EnqueueArgs,
    }

    #[test]
    fn absolute_time() {
        let w = Wrapper::try_parse_from(["x", "hello", "--at", "1700000000"]).unwrap();
        assert_eq!(w.args.deliver_at(), 1_700_000_000);
        assert_eq!(w.args.payload().unwrap(), "hello");
    }

    #[test]
    fn relative_time() {
        let w = Wrapper::try_parse_from(["x", "hello", "--in", "60"]).unwrap();
        let expected = now_epoch_seconds() + 60;
        assert!((w.args.deliver_at() - expected).abs() <= 1);
    }

    #[test]
    fn time_is_required_and_exclusive() {
        assert!(Wrapper::try_parse_from(["x", "hello"]).is_err());
        assert!(Wrapper::try_parse_from(["x", "hello", "--at", "1", "--in", "2"]).is_err());
    }
}
