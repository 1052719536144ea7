//! Search/LLM adapter: prompt in, `SearchContent` out
use crate::adapter::Guarded;
use crate::clients::SearchClient;
use crate::error::ClientError;
use async_trait::async_trait;
use guide_core::{
    providers, ContentProvider, GenerationContext, ProviderPayload, ProviderResult, SearchContent,
};
use guide_resilience::namespaces;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct SearchAdapter {
    client: Arc<dyn SearchClient>,
    guard: Guarded,
}

/// Malformed model output is worth another attempt
fn retryable(err: &ClientError) -> bool {
    err.is_transient() || matches!(err, ClientError::InvalidResponse(_))
}

impl SearchAdapter {
    pub fn new(client: Arc<dyn SearchClient>, guard: Guarded) -> Self {
        Self {
            client,
            guard: guard.with_retryable(retryable),
        }
    }
}

pub fn build_prompt(ctx: &GenerationContext) -> String {
    let prefs = &ctx.preferences;
    let interests = if prefs.interests.is_empty() {
        "general sightseeing".to_string()
    } else {
        prefs.interests.iter().cloned().collect::<Vec<_>>().join(", ")
    };

    let mut prompt = format!(
        "Write a {days}-day travel guide for {dest} from {start} to {end}.\n\
         Budget: {budget}. Interests: {interests}.\n",
        days = ctx.duration_days,
        dest = ctx.destination,
        start = ctx.start_date,
        end = ctx.end_date,
        budget = prefs.budget.symbol(),
        interests = interests,
    );
    if let Some(persona) = ctx.persona() {
        prompt.push_str(&format!("Traveler profile: {}.\n", persona.label()));
    }
    if let Some(group) = prefs.group_type {
        prompt.push_str(&format!("Travelling as: {:?}.\n", group).to_lowercase());
    }
    if let Some(pace) = prefs.pace {
        prompt.push_str(&format!("Preferred pace: {:?}.\n", pace).to_lowercase());
    }
    if let Some(stay) = &ctx.accommodation {
        prompt.push_str(&format!("Staying at: {}.\n", stay));
    }
    prompt.push_str(
        "Return JSON with keys: summary, destination_insights, \
         itinerary (array of {day, title, morning, afternoon, evening} with activity strings), \
         restaurants, attractions, hidden_gems (arrays of {name, description, category, price_level}), \
         neighborhoods (array of {name, description, best_for}), \
         practical_info ({currency, language, emergency_number, transportation, tips}).",
    );
    prompt
}

/// Extract the JSON object from a model reply, tolerating prose or code
/// fences around it
pub fn parse_search_reply(reply: &str) -> Result<SearchContent, ClientError> {
    let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}')) else {
        return Err(ClientError::InvalidResponse("reply contains no JSON object".into()));
    };
    if end < start {
        return Err(ClientError::InvalidResponse("reply contains no JSON object".into()));
    }
    let content: SearchContent = serde_json::from_str(&reply[start..=end])
        .map_err(|e| ClientError::InvalidResponse(format!("search reply: {}", e)))?;

    let empty = content.summary.trim().is_empty()
        && content.itinerary.is_empty()
        && content.restaurants.is_empty()
        && content.attractions.is_empty();
    if empty {
        return Err(ClientError::InvalidResponse("search reply has no content".into()));
    }
    Ok(content)
}

fn cache_params(ctx: &GenerationContext) -> Value {
    let prefs = &ctx.preferences;
    json!({
        "destination": ctx.destination,
        "start": ctx.start_date,
        "end": ctx.end_date,
        "budget": prefs.budget.symbol(),
        "interests": prefs.interests,
        "group": prefs.group_type,
        "pace": prefs.pace,
        "persona": ctx.persona(),
    })
}

#[async_trait]
impl ContentProvider for SearchAdapter {
    fn name(&self) -> &str {
        providers::SEARCH
    }

    async fn fetch(&self, ctx: &GenerationContext) -> ProviderResult {
        let prompt = build_prompt(ctx);
        let params = cache_params(ctx);
        self.guard
            .execute(
                namespaces::SEARCH,
                &params,
                |_| {
                    let client = Arc::clone(&self.client);
                    let prompt = prompt.clone();
                    async move {
                        let reply = client.query(&prompt).await?;
                        parse_search_reply(&reply)
                    }
                },
                ProviderPayload::Search,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Resilience;
    use chrono::NaiveDate;
    use guide_core::{BudgetTier, FailureKind, PersonaTag, TravelPreferences};
    use guide_resilience::RetryPolicy;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    struct ScriptedSearch {
        replies: Vec<Result<String, ClientError>>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl SearchClient for ScriptedSearch {
        async fn query(&self, _prompt: &str) -> Result<String, ClientError> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.replies[i.min(self.replies.len() - 1)].clone()
        }
    }

    fn ctx() -> GenerationContext {
        GenerationContext::new(
            "Paris",
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            None,
            TravelPreferences::new(BudgetTier::Luxury).with_interest("fine dining"),
        )
        .unwrap()
    }

    fn adapter(client: Arc<ScriptedSearch>) -> SearchAdapter {
        let guard = Guarded::new(providers::SEARCH, Resilience::fresh())
            .with_retry(RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(1)));
        SearchAdapter::new(client, guard)
    }

    #[test]
    fn test_parse_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"summary\": \"Paris in June\", \"restaurants\": [{\"name\": \"Septime\"}]}\n```";
        let content = parse_search_reply(reply).unwrap();
        assert_eq!(content.summary, "Paris in June");
        assert_eq!(content.restaurants[0].name, "Septime");
    }

    #[test]
    fn test_parse_rejects_empty_and_garbage() {
        assert!(parse_search_reply("no json here").is_err());
        assert!(parse_search_reply("} {").is_err());
        assert!(parse_search_reply("{}").is_err());
    }

    #[test]
    fn test_prompt_mentions_request_facts() {
        let ctx = ctx();
        ctx.assign_persona(PersonaTag::LuxuryConnoisseur);
        let prompt = build_prompt(&ctx);
        assert!(prompt.contains("3-day"));
        assert!(prompt.contains("Paris"));
        assert!(prompt.contains("$$$$"));
        assert!(prompt.contains("fine dining"));
        assert!(prompt.contains(PersonaTag::LuxuryConnoisseur.label()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_reply_is_retried() {
        let client = Arc::new(ScriptedSearch {
            replies: vec![
                Ok("sorry, I cannot".into()),
                Ok(r#"{"summary": "A long weekend in Paris."}"#.into()),
            ],
            calls: AtomicU32::new(0),
        });
        let result = adapter(client.clone()).fetch(&ctx()).await;
        assert!(result.is_success());
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_not_retried() {
        let client = Arc::new(ScriptedSearch {
            replies: vec![Err(ClientError::Auth("401: invalid key".into()))],
            calls: AtomicU32::new(0),
        });
        let result = adapter(client.clone()).fetch(&ctx()).await;
        assert!(matches!(
            result,
            ProviderResult::Failure { kind: FailureKind::Auth, .. }
        ));
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }
}
