use billionaire::prelude::*;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Trading policy
// ---------------------------------------------------------------------------

/// Offers every card of a randomly chosen commodity it holds two or
/// more of, one offer at a time.
struct RandomTrader {
    rng: StdRng,
}

impl RandomTrader {
    fn new() -> Self {
        Self { rng: StdRng::from_rng(&mut rand::rng()) }
    }

    fn pick(&mut self, view: &GameView) -> Option<Command> {
        if view.has_open_offer() {
            return None;
        }

        let tradable: Vec<(CardId, u32)> = view
            .hand
            .iter()
            .filter(|(card, amt)| card.is_commodity() && *amt >= 2)
            .collect();
        let &(card, held) = tradable.choose(&mut self.rng)?;

        // Occasionally hold one back so sizes vary between offers.
        let amt = if held > 2 && self.rng.random_range(0..4) == 0 { held - 1 } else { held };
        let cards: CardMultiset = [(card, amt)].into_iter().collect();
        Some(Command::new_offer(&cards))
    }
}

impl Bot for RandomTrader {
    async fn issue_command(&mut self, view: &GameView) -> Issued {
        self.pick(view).into()
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ClientConfig::from_env()?;
    tracing::info!(addr = %config.address(), "starting random trader");

    let client = BillionaireClient::connect(config).await?;
    let driver = BotDriver::new(client, RandomTrader::new());

    let ran = tokio::select! {
        end = driver.run() => end,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
            Ok(SessionEnd::Shutdown)
        }
    };

    let end = ran?;
    tracing::info!(%end, "trader stopped");
    Ok(())
}
