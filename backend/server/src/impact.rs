//! # Impact
//!
//! Sums a user's logged eco actions and turns the totals into a reply, either
//! through the completion provider or with a canned keyword reply.
use ledger::ImpactTotals;
use tracing::{debug, instrument};

use crate::{
    completion::{CompletionError, CompletionProvider},
    database::ActionStore,
    error::AppError,
    utils::require_user_id,
};

pub const NO_ACTIONS: &str = "No eco actions found for this user";

pub const BIKE_REPLY: &str =
    "Biking is one of the best ways to cut your carbon footprint. Every trip you ride instead of drive keeps emissions out of the air, keep it up!";
pub const RECYCLE_REPLY: &str =
    "Rinse containers before they go in the bin and check which plastics your local program accepts, contaminated recycling often ends up in landfill.";
pub const FALLBACK_REPLY: &str =
    "Tell me more about what you're doing for the planet, like biking or recycling, and I'll share some tips!";

const GENERAL_PROMPT: &str = "You are a friendly sustainability coach. Answer questions about \
    living more sustainably with short, practical, encouraging advice.";

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub reply: String,
    pub totals: ImpactTotals,
}

pub async fn aggregate(actions: &dyn ActionStore, user_id: &str) -> Result<ImpactTotals, AppError> {
    let user_id = require_user_id(user_id)?;

    let rows = actions.list_impacts(user_id).await?;
    if rows.is_empty() {
        return Err(AppError::NotFound(NO_ACTIONS));
    }

    let totals: ImpactTotals = rows.iter().collect();
    debug!(user_id, actions = rows.len(), ?totals, "Aggregated impact");

    Ok(totals)
}

pub fn summary_prompt(totals: &ImpactTotals) -> String {
    format!(
        "You are a friendly sustainability coach. Through their logged eco actions this user has \
         saved {:.2} kg of CO2, {:.2} liters of water, {:.2} kg of waste and {:.2} kWh of energy. \
         Use these totals to answer their message: celebrate their impact in concrete terms and \
         suggest one practical next step. Keep it under 120 words.",
        totals.carbon, totals.water, totals.waste, totals.energy
    )
}

#[instrument(level = "debug", skip(actions, provider, message))]
pub async fn summarize(
    actions: &dyn ActionStore,
    provider: Option<&dyn CompletionProvider>,
    user_id: &str,
    message: &str,
) -> Result<Summary, AppError> {
    let totals = aggregate(actions, user_id).await?;

    let provider = provider.ok_or(CompletionError::NotConfigured)?;
    let reply = provider.complete(&summary_prompt(&totals), message).await?;

    Ok(Summary { reply, totals })
}

/// Chat without a user: no totals, general prompt.
pub async fn converse(
    provider: Option<&dyn CompletionProvider>,
    message: &str,
) -> Result<String, AppError> {
    let provider = provider.ok_or(CompletionError::NotConfigured)?;

    Ok(provider.complete(GENERAL_PROMPT, message).await?)
}

pub fn basic_reply(message: &str) -> &'static str {
    let message = message.to_lowercase();

    if message.contains("bike") {
        BIKE_REPLY
    } else if message.contains("recycle") {
        RECYCLE_REPLY
    } else {
        FALLBACK_REPLY
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use ledger::NewEcoAction;

    use super::*;
    use crate::database::memory::MemoryStore;

    #[derive(Default)]
    struct Recorder {
        prompts: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CompletionProvider for Recorder {
        async fn complete(&self, system_prompt: &str, message: &str) -> Result<String, CompletionError> {
            self.prompts
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), message.to_string()));

            Ok("You're doing great".to_string())
        }
    }

    struct Down;

    #[async_trait]
    impl CompletionProvider for Down {
        async fn complete(&self, _: &str, _: &str) -> Result<String, CompletionError> {
            Err(CompletionError::EmptyReply)
        }
    }

    fn action(carbon: f64, water: f64, waste: f64, energy: f64) -> NewEcoAction {
        NewEcoAction {
            user_id: "u1".to_string(),
            name: "Line dry laundry".to_string(),
            points: 2,
            category: "energy".to_string(),
            description: String::new(),
            impact: "low".to_string(),
            carbon_saved: carbon,
            water_saved: water,
            waste_saved: waste,
            energy_saved: energy,
        }
    }

    async fn store_with_actions() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_action(&action(1.5, 10.0, 0.0, 2.0)).await.unwrap();
        store.insert_action(&action(0.5, 0.0, 1.25, 0.0)).await.unwrap();
        store
    }

    #[test]
    fn test_basic_reply_keywords() {
        assert_eq!(basic_reply("I want to bike to work"), BIKE_REPLY);
        assert_eq!(basic_reply("how do I recycle plastics"), RECYCLE_REPLY);
        assert_eq!(basic_reply("hello"), FALLBACK_REPLY);
    }

    #[test]
    fn test_basic_reply_ignores_case_and_prefers_bike() {
        assert_eq!(basic_reply("BIKE"), BIKE_REPLY);
        assert_eq!(basic_reply("Should I ReCyCle?"), RECYCLE_REPLY);
        assert_eq!(basic_reply("recycle my old bike"), BIKE_REPLY);
        assert_eq!(basic_reply("motorbikes"), BIKE_REPLY);
        assert_eq!(basic_reply(""), FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_aggregate_sums_fields() {
        let store = store_with_actions().await;

        let totals = aggregate(&store, "u1").await.unwrap();
        assert_eq!(
            totals,
            ImpactTotals {
                carbon: 2.0,
                water: 10.0,
                waste: 1.25,
                energy: 2.0,
            }
        );
    }

    #[tokio::test]
    async fn test_aggregate_without_actions() {
        let store = store_with_actions().await;

        assert!(matches!(aggregate(&store, "u2").await, Err(AppError::NotFound(NO_ACTIONS))));
    }

    #[tokio::test]
    async fn test_summarize_embeds_totals() {
        let store = store_with_actions().await;
        let provider = Recorder::default();

        let summary = summarize(&store, Some(&provider), "u1", "how am I doing?")
            .await
            .unwrap();
        assert_eq!(summary.reply, "You're doing great");
        assert_eq!(summary.totals.carbon, 2.0);

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        let (system, message) = &prompts[0];
        assert!(system.contains("2.00 kg of CO2"));
        assert!(system.contains("10.00 liters of water"));
        assert!(system.contains("1.25 kg of waste"));
        assert!(system.contains("2.00 kWh of energy"));
        assert_eq!(message, "how am I doing?");
    }

    #[tokio::test]
    async fn test_summarize_checks_actions_before_provider() {
        let store = MemoryStore::new();
        let provider = Recorder::default();

        let err = summarize(&store, Some(&provider), "u1", "hi").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summarize_upstream_failures() {
        let store = store_with_actions().await;

        let err = summarize(&store, Some(&Down), "u1", "hi").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(CompletionError::EmptyReply)));

        let err = summarize(&store, None, "u1", "hi").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(CompletionError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_converse_uses_general_prompt() {
        let provider = Recorder::default();

        let reply = converse(Some(&provider), "what is composting?").await.unwrap();
        assert_eq!(reply, "You're doing great");
        assert_eq!(provider.prompts.lock().unwrap()[0].0, GENERAL_PROMPT);
    }
}
