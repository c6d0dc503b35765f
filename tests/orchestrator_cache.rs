// tests/orchestrator_cache.rs
//! Answer orchestration: cache-first behavior, grounding selection per flow,
//! bounded retry and the never-cached fallback sentence.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use elo_assistant::datahub::types::{DataSource, SourceDocument, SourceName};
use elo_assistant::datahub::DataHub;
use elo_assistant::error::{ProviderError, SourceFetchError};
use elo_assistant::intent::Intent;
use elo_assistant::llm::prompt::FALLBACK_LLM_MESSAGE;
use elo_assistant::llm::{ChatModel, ChatRequest};
use elo_assistant::orchestrator::{AnswerOrchestrator, AnswerOrigin, AnswerRequest};
use elo_assistant::state::UserStateStore;
use elo_assistant::store::MemoryStore;

/// Chat-model stub: scripted outcomes, call counting, request capture.
struct ScriptedModel {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<ChatRequest>>,
}

impl ScriptedModel {
    fn answering(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::from([Ok(reply.to_string())])),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    fn scripted(outcomes: Vec<Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_user_content(&self) -> String {
        let guard = self.last_request.lock().unwrap();
        let request = guard.as_ref().expect("model was never called");
        request.messages.last().unwrap().content.clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("resposta padrão".to_string()))
    }
    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

struct CountingSource {
    docs: Vec<SourceDocument>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl DataSource for CountingSource {
    async fn fetch(&self, _query: &str) -> Result<Vec<SourceDocument>, SourceFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.docs.clone())
    }
    fn name(&self) -> &'static str {
        "counting"
    }
}

fn legislative_doc() -> SourceDocument {
    SourceDocument {
        id: "LEG-1".to_string(),
        title: "Projeto sobre auxílio".to_string(),
        summary: "Cria novo benefício social.".to_string(),
        year: Some("2024".to_string()),
        source: SourceName::Camara,
        link: String::new(),
    }
}

fn orchestrator_with(
    model: Arc<dyn ChatModel>,
    legislative_calls: Arc<AtomicUsize>,
) -> AnswerOrchestrator {
    let store = Arc::new(MemoryStore::new());
    let datahub = Arc::new(DataHub::from_sources(
        vec![Arc::new(CountingSource {
            docs: vec![legislative_doc()],
            calls: legislative_calls,
        })],
        vec![],
        Duration::from_millis(200),
    ));
    AnswerOrchestrator::new(
        store.clone(),
        Duration::from_secs(600),
        UserStateStore::new(store, Duration::from_secs(600), 4),
        datahub,
        model,
    )
}

#[tokio::test]
async fn identical_question_hits_the_cache_without_a_second_model_call() {
    let model = ScriptedModel::answering("emitir o CPF é gratuito.");
    let orchestrator = orchestrator_with(model.clone(), Arc::new(AtomicUsize::new(0)));
    let request = AnswerRequest::text("u1", "como tirar o CPF?", Intent::Civic);

    let first = orchestrator.answer(&request).await;
    assert!(first.success);
    assert_eq!(first.origin, AnswerOrigin::Model);

    let second = orchestrator.answer(&request).await;
    assert_eq!(second.origin, AnswerOrigin::Cache);
    assert_eq!(second.text, first.text);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn cache_key_normalizes_whitespace_and_case() {
    let model = ScriptedModel::answering("resposta");
    let orchestrator = orchestrator_with(model.clone(), Arc::new(AtomicUsize::new(0)));

    orchestrator
        .answer(&AnswerRequest::text("u1", "Como tirar   o CPF?", Intent::Civic))
        .await;
    let second = orchestrator
        .answer(&AnswerRequest::text("u1", "como tirar o cpf?", Intent::Civic))
        .await;
    assert_eq!(second.origin, AnswerOrigin::Cache);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn missing_credentials_fall_back_without_retry_and_are_not_cached() {
    let model = ScriptedModel::scripted(vec![
        Err(ProviderError::Config("OPENAI_API_KEY")),
        Err(ProviderError::Config("OPENAI_API_KEY")),
    ]);
    let orchestrator = orchestrator_with(model.clone(), Arc::new(AtomicUsize::new(0)));
    let request = AnswerRequest::text("u1", "oi", Intent::Civic);

    let first = orchestrator.answer(&request).await;
    assert!(!first.success);
    assert_eq!(first.origin, AnswerOrigin::Fallback);
    assert_eq!(first.text, FALLBACK_LLM_MESSAGE);

    // Not cached: the second call reaches the model again.
    let second = orchestrator.answer(&request).await;
    assert_eq!(second.origin, AnswerOrigin::Fallback);
    assert_eq!(model.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_until_success() {
    let model = ScriptedModel::scripted(vec![
        Err(ProviderError::Call("503".to_string())),
        Err(ProviderError::Call("503".to_string())),
        Ok("terceira tentativa".to_string()),
    ]);
    let orchestrator = orchestrator_with(model.clone(), Arc::new(AtomicUsize::new(0)));

    let outcome = orchestrator
        .answer(&AnswerRequest::text("u1", "oi", Intent::Civic))
        .await;
    assert!(outcome.success);
    assert_eq!(outcome.text, "terceira tentativa");
    assert_eq!(model.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_return_the_fixed_fallback() {
    let model = ScriptedModel::scripted(vec![
        Err(ProviderError::Call("timeout".to_string())),
        Err(ProviderError::Call("timeout".to_string())),
        Err(ProviderError::Call("timeout".to_string())),
    ]);
    let orchestrator = orchestrator_with(model.clone(), Arc::new(AtomicUsize::new(0)));

    let outcome = orchestrator
        .answer(&AnswerRequest::text("u1", "oi", Intent::Civic))
        .await;
    assert!(!outcome.success);
    assert_eq!(outcome.text, FALLBACK_LLM_MESSAGE);
    assert_eq!(model.calls(), 3);
}

#[tokio::test]
async fn civic_without_legal_keywords_grounds_on_the_builtin_catalog() {
    let model = ScriptedModel::answering("resposta");
    let legislative_calls = Arc::new(AtomicUsize::new(0));
    let orchestrator = orchestrator_with(model.clone(), legislative_calls.clone());

    orchestrator
        .answer(&AnswerRequest::text("u1", "como tirar o cpf?", Intent::Civic))
        .await;

    assert_eq!(legislative_calls.load(Ordering::SeqCst), 0);
    assert!(model.last_user_content().contains("MOCK-001"));
}

#[tokio::test]
async fn civic_with_legal_keywords_grounds_on_legislative_sources() {
    let model = ScriptedModel::answering("resposta");
    let legislative_calls = Arc::new(AtomicUsize::new(0));
    let orchestrator = orchestrator_with(model.clone(), legislative_calls.clone());

    orchestrator
        .answer(&AnswerRequest::text("u1", "tenho direito a auxílio?", Intent::Civic))
        .await;

    assert_eq!(legislative_calls.load(Ordering::SeqCst), 1);
    assert!(model.last_user_content().contains("LEG-1"));
}

#[tokio::test]
async fn legislative_flow_always_queries_the_aggregator() {
    let model = ScriptedModel::answering("resposta");
    let legislative_calls = Arc::new(AtomicUsize::new(0));
    let orchestrator = orchestrator_with(model.clone(), legislative_calls.clone());

    orchestrator
        .answer(&AnswerRequest::text("u1", "como anda o pl 1234?", Intent::Legislative))
        .await;

    assert_eq!(legislative_calls.load(Ordering::SeqCst), 1);
    assert!(model.last_user_content().contains("LEG-1"));
}

#[tokio::test]
async fn oracle_flow_skips_the_aggregator_and_forwards_the_image() {
    let model = ScriptedModel::answering("é um boleto.");
    let legislative_calls = Arc::new(AtomicUsize::new(0));
    let orchestrator = orchestrator_with(model.clone(), legislative_calls.clone());

    let request = AnswerRequest {
        user_id: "u1",
        question: "o que é isso?",
        intent: Intent::Oracle,
        media_url: Some("http://x/y.jpg"),
        extracted_content: None,
    };
    let outcome = orchestrator.answer(&request).await;

    assert!(outcome.success);
    assert_eq!(legislative_calls.load(Ordering::SeqCst), 0);
    let guard = model.last_request.lock().unwrap();
    let captured = guard.as_ref().unwrap();
    assert_eq!(captured.image_url.as_deref(), Some("http://x/y.jpg"));
}

#[tokio::test]
async fn oracle_extracted_content_becomes_the_grounding_block() {
    let model = ScriptedModel::answering("resumo do documento.");
    let orchestrator = orchestrator_with(model.clone(), Arc::new(AtomicUsize::new(0)));

    let request = AnswerRequest {
        user_id: "u1",
        question: "resuma esse documento",
        intent: Intent::Oracle,
        media_url: None,
        extracted_content: Some("CONTRATO DE ALUGUEL: o locatário se compromete..."),
    };
    orchestrator.answer(&request).await;
    assert!(model.last_user_content().contains("CONTRATO DE ALUGUEL"));
}

#[tokio::test]
async fn history_is_bounded_and_skipped_on_fallback() {
    let model = ScriptedModel::scripted(vec![]);
    let orchestrator = orchestrator_with(model.clone(), Arc::new(AtomicUsize::new(0)));

    for i in 0..6 {
        orchestrator
            .answer(&AnswerRequest::text("u1", &format!("pergunta {i}"), Intent::Civic))
            .await;
    }

    // Retention cap is 4 turns: system + 4 history turns + question.
    let guard = model.last_request.lock().unwrap();
    let captured = guard.as_ref().unwrap();
    assert_eq!(captured.messages.len(), 6);
    drop(guard);

    // A fallback answer must not enter history.
    let failing = ScriptedModel::scripted(vec![Err(ProviderError::Config("OPENAI_API_KEY"))]);
    let store = Arc::new(MemoryStore::new());
    let orchestrator = AnswerOrchestrator::new(
        store.clone(),
        Duration::from_secs(600),
        UserStateStore::new(store, Duration::from_secs(600), 4),
        Arc::new(DataHub::from_sources(vec![], vec![], Duration::from_millis(50))),
        failing.clone(),
    );
    orchestrator
        .answer(&AnswerRequest::text("u2", "primeira", Intent::Civic))
        .await;
    orchestrator
        .answer(&AnswerRequest::text("u2", "segunda", Intent::Civic))
        .await;
    let guard = failing.last_request.lock().unwrap();
    let captured = guard.as_ref().unwrap();
    // No history accumulated: just system + question.
    assert_eq!(captured.messages.len(), 2);
}
