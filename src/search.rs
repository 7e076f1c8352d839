//! HTTP API (axum): answer search, subject list, submissions and moderation.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{check_threshold, Result};
use crate::records::{self, Page, QaRecord};
use crate::subjects::{self, Catalogue, LetterGroup, PendingAnswers, SubjectSummary};
use crate::websearch::{self, Engine};

/// Catalogue plus the file it is persisted to.
pub struct AppState {
    pub catalogue: RwLock<Catalogue>,
    pub data_path: PathBuf,
    pub min_similarity: f64,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(catalogue: Catalogue, data_path: PathBuf, min_similarity: f64) -> SharedState {
        Arc::new(Self {
            catalogue: RwLock::new(catalogue),
            data_path,
            min_similarity,
        })
    }

    /// Apply `change` to a copy of the catalogue, persist the copy, then publish it.
    /// On any error the published catalogue is left untouched.
    pub async fn update<T, F>(&self, change: F) -> Result<T>
    where
        F: FnOnce(&mut Catalogue) -> Result<T>,
    {
        let mut catalogue = self.catalogue.write().await;
        let mut next = catalogue.clone();
        let out = change(&mut next)?;
        next.save_async(&self.data_path).await?;
        *catalogue = next;
        Ok(out)
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/search", get(search_handler))
        .route("/subjects", get(subjects_handler))
        .route("/subjects/:id/answers", post(add_answer_handler))
        .route("/unverified", get(unverified_handler))
        .route("/unverified/verify", post(verify_handler))
        .route("/unverified/delete", post(delete_handler))
        .route("/websearch", get(websearch_handler))
        .with_state(state)
}

/// Query params for GET /search?q=...&subject=...&limit=...&more=...&min_similarity=...
#[derive(Deserialize, Default)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub subject: Option<u64>,
    /// Explicit page size; overrides `more`.
    pub limit: Option<usize>,
    /// Number of "load more" steps past the first page.
    #[serde(default)]
    pub more: usize,
    pub min_similarity: Option<f64>,
}

/// GET /search -> first `limit` matching records of one subject, or of all.
pub async fn search_handler(
    State(state): State<SharedState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Page<QaRecord>>> {
    let min_similarity = check_threshold(params.min_similarity.unwrap_or(state.min_similarity))?;
    let limit = params.limit.unwrap_or_else(|| records::display_limit(params.more));
    let catalogue = state.catalogue.read().await;

    let hits = match params.subject {
        Some(id) => records::filter_records(&catalogue.get(id)?.answers, &params.q, min_similarity),
        None => records::filter_records(
            catalogue.subjects().iter().flat_map(|s| &s.answers),
            &params.q,
            min_similarity,
        ),
    };
    debug!(query = %params.q, hits = hits.len(), "search");

    let page = records::paginate(hits, limit);
    Ok(Json(Page {
        items: page.items.into_iter().cloned().collect(),
        total: page.total,
        has_more: page.has_more,
    }))
}

#[derive(Deserialize, Default)]
pub struct SubjectsQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /subjects?q=... -> letter groups of matching subjects.
pub async fn subjects_handler(
    State(state): State<SharedState>,
    Query(params): Query<SubjectsQuery>,
) -> Json<Vec<LetterGroup<SubjectSummary>>> {
    let catalogue = state.catalogue.read().await;
    let groups = subjects::filter_groups(subjects::group_by_letter(catalogue.subjects()), &params.q);
    let groups = groups
        .into_iter()
        .map(|g| LetterGroup {
            letter: g.letter,
            subjects: g.subjects.into_iter().map(SubjectSummary::from).collect(),
        })
        .collect();
    Json(groups)
}

#[derive(Deserialize)]
pub struct NewAnswer {
    pub question: String,
    pub answer: String,
}

/// POST /subjects/:id/answers -> the stored, unverified record.
pub async fn add_answer_handler(
    State(state): State<SharedState>,
    Path(id): Path<u64>,
    Json(body): Json<NewAnswer>,
) -> Result<(StatusCode, Json<QaRecord>)> {
    let record = state
        .update(|c| c.add_answer(id, &body.question, &body.answer).cloned())
        .await?;
    info!(subject_id = id, "answer submitted");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /unverified -> subjects with answers awaiting verification.
pub async fn unverified_handler(State(state): State<SharedState>) -> Json<Vec<PendingAnswers>> {
    Json(state.catalogue.read().await.unverified())
}

#[derive(Deserialize)]
pub struct AnswerRef {
    pub subject_id: u64,
    pub question: String,
    pub answer: String,
}

/// POST /unverified/verify -> number of records marked verified.
pub async fn verify_handler(
    State(state): State<SharedState>,
    Json(body): Json<AnswerRef>,
) -> Result<Json<usize>> {
    let n = state
        .update(|c| c.verify(body.subject_id, &body.question, &body.answer))
        .await?;
    Ok(Json(n))
}

/// POST /unverified/delete -> number of records removed.
pub async fn delete_handler(
    State(state): State<SharedState>,
    Json(body): Json<AnswerRef>,
) -> Result<Json<usize>> {
    let n = state
        .update(|c| c.delete(body.subject_id, &body.question, &body.answer))
        .await?;
    Ok(Json(n))
}

#[derive(Deserialize)]
pub struct WebSearchQuery {
    pub engine: Engine,
    #[serde(default)]
    pub q: String,
}

/// GET /websearch?engine=google&q=... -> redirect to the engine.
pub async fn websearch_handler(Query(params): Query<WebSearchQuery>) -> Result<Redirect> {
    let url = websearch::search_url(params.engine, &params.q)?;
    Ok(Redirect::to(url.as_str()))
}

/// GET / -> static HTML search page.
pub async fn index_page() -> axum::response::Html<&'static str> {
    const HTML: &str = r#"
<!DOCTYPE html>
<html lang="ru">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Poly Saboteur</title>
  <style>
    body { font-family: system-ui, sans-serif; max-width: 760px; margin: 2rem auto; padding: 0 1rem; }
    h1 { font-size: 1.5rem; }
    select, input[type="search"] { width: 100%; padding: 0.5rem; font-size: 1rem; box-sizing: border-box; margin-bottom: 0.5rem; }
    .item { padding: 0.5rem 0; border-bottom: 1px solid #eee; }
    .q { font-weight: 600; }
    .unverified { color: #a60; }
    .none { color: #666; }
    button { margin-top: 0.5rem; padding: 0.5rem 1rem; font-size: 1rem; cursor: pointer; }
  </style>
</head>
<body>
  <h1>Poly Saboteur</h1>
  <select id="subject"><option value="">Все предметы</option></select>
  <input type="search" id="q" placeholder="Поиск..." autofocus>
  <div id="results"></div>
  <button id="more" hidden>Показать ещё</button>
  <script>
    const subject = document.getElementById('subject');
    const q = document.getElementById('q');
    const results = document.getElementById('results');
    const more = document.getElementById('more');
    let steps = 0;
    fetch('/subjects').then(r => r.json()).then(groups => {
      for (const g of groups) {
        const og = document.createElement('optgroup');
        og.label = g.letter;
        for (const s of g.subjects) {
          const o = document.createElement('option');
          o.value = s.id;
          o.textContent = s.name + ' (' + s.questions_count + ')';
          og.appendChild(o);
        }
        subject.appendChild(og);
      }
    });
    const esc = s => s.replace(/[&<>"]/g, c => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;'}[c]));
    async function run() {
      const params = new URLSearchParams({ q: q.value, more: steps });
      if (subject.value) params.set('subject', subject.value);
      const r = await fetch('/search?' + params);
      if (!r.ok) { results.innerHTML = '<p class="none">' + esc(await r.text()) + '</p>'; return; }
      const page = await r.json();
      results.innerHTML = page.items.length === 0 ? '<p class="none">Ничего не найдено</p>' :
        page.items.map(i => '<div class="item"><div class="q">' + esc(i.question) + '</div><div class="' +
          (i.unverified ? 'unverified' : '') + '">' + esc(i.answer) + '</div></div>').join('');
      more.hidden = !page.has_more;
    }
    q.addEventListener('input', () => { steps = 0; run(); });
    subject.addEventListener('change', () => { steps = 0; run(); });
    more.addEventListener('click', () => { steps += 1; run(); });
    run();
  </script>
</body>
</html>
"#;
    axum::response::Html(HTML)
}
