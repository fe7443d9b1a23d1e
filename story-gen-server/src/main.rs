use std::sync::{Mutex, MutexGuard};

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{delete, get, post, web, App, HttpResponse, HttpServer, Responder};

use log::info;
use serde::Deserialize;
use story_gen_core::api::{FavoriteBody, GenerationReply, PoemBody, StoryBody};
use story_gen_core::config::AppConfig;
use story_gen_core::model::backend::{ModelInit, ModelStatus};
use story_gen_core::model::generator::Generator;
use story_gen_core::model::request::GenerationRequest;
use story_gen_core::store::{Collection, Store};
use story_gen_core::Error;

/// Query parameters of the collection listings.
#[derive(Deserialize)]
struct ListQuery {
	/// Reload the collection from disk before answering.
	refresh: Option<bool>,
}

struct SharedData {
	generator: Generator,
	status: ModelStatus,
	store: Mutex<Store>,
}

impl SharedData {
	fn store(&self) -> Result<MutexGuard<'_, Store>, HttpResponse> {
		self.store
			.lock()
			.map_err(|_| HttpResponse::InternalServerError().body("Store lock failed"))
	}
}

/// Runs one generation on the blocking pool and records it in history.
///
/// Rejections and model failures are regular results: they come back with
/// status 200 and are recorded like any other text.
async fn generate_and_record(data: web::Data<SharedData>, request: GenerationRequest) -> HttpResponse {
	let generator = data.generator.clone();
	let result = web::block(move || {
		let content = generator.generate(&request);
		(request, content)
	})
	.await;

	let (request, content) = match result {
		Ok(r) => r,
		Err(e) => return HttpResponse::InternalServerError().body(format!("Generation task failed: {e}")),
	};

	match data.store() {
		Ok(mut store) => {
			store.record_generation(&request, &content);
		}
		Err(response) => return response,
	}

	HttpResponse::Ok().json(GenerationReply { content, kind: request.mode.kind() })
}

/// HTTP POST endpoint `/v1/story`
///
/// Generates a story from a `StoryBody` and appends it to history.
#[post("/v1/story")]
async fn post_story(data: web::Data<SharedData>, body: web::Json<StoryBody>) -> impl Responder {
	match body.into_inner().into_request() {
		Ok(request) => generate_and_record(data, request).await,
		Err(e) => HttpResponse::BadRequest().body(e.to_string()),
	}
}

/// HTTP POST endpoint `/v1/poem`
///
/// Generates a poem from a `PoemBody` and appends it to history.
#[post("/v1/poem")]
async fn post_poem(data: web::Data<SharedData>, body: web::Json<PoemBody>) -> impl Responder {
	match body.into_inner().into_request() {
		Ok(request) => generate_and_record(data, request).await,
		Err(e) => HttpResponse::BadRequest().body(e.to_string()),
	}
}

#[get("/v1/model")]
async fn get_model(data: web::Data<SharedData>) -> impl Responder {
	HttpResponse::Ok().json(&data.status)
}

fn list(data: &SharedData, collection: Collection, refresh: bool) -> HttpResponse {
	let mut store = match data.store() {
		Ok(store) => store,
		Err(response) => return response,
	};
	if refresh {
		store.refresh(collection);
	}
	HttpResponse::Ok().json(store.entries(collection))
}

fn entry(data: &SharedData, collection: Collection, index: usize) -> HttpResponse {
	let store = match data.store() {
		Ok(store) => store,
		Err(response) => return response,
	};
	match store.get(collection, index) {
		Some(entry) => HttpResponse::Ok().json(entry),
		None => HttpResponse::NotFound().body(format!("No entry at index {index}")),
	}
}

#[get("/v1/history")]
async fn get_history(data: web::Data<SharedData>, query: web::Query<ListQuery>) -> impl Responder {
	list(&data, Collection::History, query.refresh.unwrap_or(false))
}

#[get("/v1/history/{index}")]
async fn get_history_entry(data: web::Data<SharedData>, index: web::Path<usize>) -> impl Responder {
	entry(&data, Collection::History, index.into_inner())
}

#[delete("/v1/history")]
async fn delete_history(data: web::Data<SharedData>) -> impl Responder {
	match data.store() {
		Ok(mut store) => {
			store.clear(Collection::History);
			HttpResponse::Ok().json(store.entries(Collection::History))
		}
		Err(response) => response,
	}
}

#[get("/v1/favorites")]
async fn get_favorites(data: web::Data<SharedData>, query: web::Query<ListQuery>) -> impl Responder {
	list(&data, Collection::Favorites, query.refresh.unwrap_or(false))
}

#[get("/v1/favorites/{index}")]
async fn get_favorite(data: web::Data<SharedData>, index: web::Path<usize>) -> impl Responder {
	entry(&data, Collection::Favorites, index.into_inner())
}

/// HTTP POST endpoint `/v1/favorites`
///
/// Adds a result to favorites. Blank content is refused with 400.
#[post("/v1/favorites")]
async fn post_favorite(data: web::Data<SharedData>, body: web::Json<FavoriteBody>) -> impl Responder {
	let mut store = match data.store() {
		Ok(store) => store,
		Err(response) => return response,
	};
	match store.add_favorite(&body.content, body.kind) {
		Ok(entry) => HttpResponse::Created().json(entry),
		Err(Error::EmptyContent) => HttpResponse::BadRequest().body("请先生成内容再收藏"),
		Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
	}
}

/// HTTP DELETE endpoint `/v1/favorites/{index}`
///
/// Answers the remaining favorites; an out-of-range index changes nothing.
#[delete("/v1/favorites/{index}")]
async fn delete_favorite(data: web::Data<SharedData>, index: web::Path<usize>) -> impl Responder {
	match data.store() {
		Ok(mut store) => {
			store.remove_at(Collection::Favorites, index.into_inner());
			HttpResponse::Ok().json(store.entries(Collection::Favorites))
		}
		Err(response) => response,
	}
}

fn routes(cfg: &mut web::ServiceConfig) {
	cfg.service(post_story)
		.service(post_poem)
		.service(get_model)
		.service(get_history)
		.service(get_history_entry)
		.service(delete_history)
		.service(get_favorites)
		.service(get_favorite)
		.service(post_favorite)
		.service(delete_favorite);
}

async fn serve(shared: web::Data<SharedData>, host: String, port: u16) -> std::io::Result<()> {
	info!("listening on {host}:{port}");
	HttpServer::new(move || {
		App::new()
			.wrap(Logger::default())
			.wrap(Cors::permissive())
			.app_data(shared.clone())
			.configure(routes)
	})
		.bind((host.as_str(), port))?
		.run()
		.await
}

/// Main entry point for the server.
///
/// Loads the configuration, selects the model once (primary, mirror, then
/// fallback), opens the store and starts an Actix-web HTTP server.
///
/// # Notes
/// - The model is probed before the async runtime starts: the blocking HTTP
///   client must be created and dropped outside of it.
/// - The store is shared behind a `Mutex` between the worker threads.
fn main() -> std::io::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let config = AppConfig::load_or_init(AppConfig::default_path()).map_err(std::io::Error::other)?;
	let init = ModelInit::load(&config.model).map_err(std::io::Error::other)?;
	let status = init.status();
	let generator = Generator::new(init.into_generator());

	let shared = web::Data::new(SharedData {
		generator: generator.clone(),
		status,
		store: Mutex::new(Store::from_config(&config)),
	});

	let result = actix_web::rt::System::new().block_on(serve(shared, config.server.host.clone(), config.server.port));
	drop(generator);
	result
}

#[cfg(test)]
mod tests {
	use std::path::{Path, PathBuf};
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use actix_web::http::StatusCode;
	use actix_web::test;
	use rand::Rng;
	use serde_json::{json, Value};
	use story_gen_core::model::backend::{GenerationParams, ModelSource, TextGenerator};
	use story_gen_core::store::DEFAULT_HISTORY_LIMIT;

	use super::*;

	struct TempDir(PathBuf);

	impl TempDir {
		fn new() -> Self {
			let suffix: u64 = rand::rng().random();
			let path = std::env::temp_dir().join(format!("story-gen-server-test-{suffix:016x}"));
			std::fs::create_dir_all(&path).unwrap();
			Self(path)
		}

		fn path(&self) -> &Path {
			&self.0
		}
	}

	impl Drop for TempDir {
		fn drop(&mut self) {
			let _ = std::fs::remove_dir_all(&self.0);
		}
	}

	/// Answers "<prompt>1. 从前有座山" and counts calls.
	struct Echo(Arc<AtomicUsize>);

	impl TextGenerator for Echo {
		fn generate(&self, prompt: &str, _: &GenerationParams) -> story_gen_core::Result<String> {
			self.0.fetch_add(1, Ordering::SeqCst);
			Ok(format!("{prompt}1. 从前有座山"))
		}

		fn model_name(&self) -> &str {
			"echo"
		}
	}

	fn shared(dir: &TempDir) -> (web::Data<SharedData>, Arc<AtomicUsize>) {
		let calls = Arc::new(AtomicUsize::new(0));
		let data = web::Data::new(SharedData {
			generator: Generator::new(Echo(calls.clone())),
			status: ModelStatus::Loaded { model: "echo".to_owned(), source: ModelSource::Primary },
			store: Mutex::new(Store::open(dir.path(), DEFAULT_HISTORY_LIMIT)),
		});
		(data, calls)
	}

	#[actix_web::test]
	async fn story_is_generated_and_recorded() {
		let dir = TempDir::new();
		let (data, calls) = shared(&dir);
		let app = test::init_service(App::new().app_data(data.clone()).configure(routes)).await;

		let req = test::TestRequest::post()
			.uri("/v1/story")
			.set_json(json!({"keywords": "公主，城堡", "genre": "sci_fi"}))
			.to_request();
		let reply: GenerationReply = test::call_and_read_body_json(&app, req).await;
		assert_eq!(reply.content, "从前有座山。");
		assert_eq!(calls.load(Ordering::SeqCst), 1);

		let req = test::TestRequest::get().uri("/v1/history").to_request();
		let history: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(history[0]["type"], "故事");
		assert_eq!(history[0]["genre"], "科幻");
		assert_eq!(history[0]["keywords"], "公主，城堡");
	}

	#[actix_web::test]
	async fn latin_keywords_are_answered_without_model_call() {
		let dir = TempDir::new();
		let (data, calls) = shared(&dir);
		let app = test::init_service(App::new().app_data(data.clone()).configure(routes)).await;

		let req = test::TestRequest::post()
			.uri("/v1/poem")
			.set_json(json!({"keywords": "spring", "style": "modern"}))
			.to_request();
		let reply: GenerationReply = test::call_and_read_body_json(&app, req).await;
		assert_eq!(reply.content, "请使用中文关键词，生成英文诗歌暂不支持。");
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[actix_web::test]
	async fn invalid_temperature_is_a_bad_request() {
		let dir = TempDir::new();
		let (data, _) = shared(&dir);
		let app = test::init_service(App::new().app_data(data.clone()).configure(routes)).await;

		let req = test::TestRequest::post()
			.uri("/v1/story")
			.set_json(json!({"keywords": "龙", "temperature": 2.0}))
			.to_request();
		let resp = test::call_service(&app, req).await;
		assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
	}

	#[actix_web::test]
	async fn favorites_lifecycle() {
		let dir = TempDir::new();
		let (data, _) = shared(&dir);
		let app = test::init_service(App::new().app_data(data.clone()).configure(routes)).await;

		let req = test::TestRequest::post()
			.uri("/v1/favorites")
			.set_json(json!({"content": "  "}))
			.to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		for content in ["春风", "夏雨"] {
			let req = test::TestRequest::post()
				.uri("/v1/favorites")
				.set_json(json!({"content": content, "kind": "诗歌"}))
				.to_request();
			assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
		}

		let req = test::TestRequest::delete().uri("/v1/favorites/5").to_request();
		let remaining: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(remaining.as_array().unwrap().len(), 2);

		let req = test::TestRequest::delete().uri("/v1/favorites/0").to_request();
		let remaining: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(remaining[0]["content"], "夏雨");

		let req = test::TestRequest::get().uri("/v1/favorites/0").to_request();
		let entry: Value = test::call_and_read_body_json(&app, req).await;
		assert_eq!(entry["title"].as_str().unwrap().get(..6), Some("收藏"));

		let req = test::TestRequest::get().uri("/v1/favorites/3").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
	}

	#[actix_web::test]
	async fn history_can_be_cleared_and_refreshed() {
		let dir = TempDir::new();
		let (data, _) = shared(&dir);
		let app = test::init_service(App::new().app_data(data.clone()).configure(routes)).await;

		let req = test::TestRequest::post()
			.uri("/v1/poem")
			.set_json(json!({"keywords": "月光"}))
			.to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

		let req = test::TestRequest::delete().uri("/v1/history").to_request();
		let history: Value = test::call_and_read_body_json(&app, req).await;
		assert!(history.as_array().unwrap().is_empty());

		std::fs::write(dir.path().join("generation_history.json"), "garbage").unwrap();
		let req = test::TestRequest::get().uri("/v1/history?refresh=true").to_request();
		let history: Value = test::call_and_read_body_json(&app, req).await;
		assert!(history.as_array().unwrap().is_empty());
	}

	#[actix_web::test]
	async fn model_status_is_reported() {
		let dir = TempDir::new();
		let (data, _) = shared(&dir);
		let app = test::init_service(App::new().app_data(data.clone()).configure(routes)).await;

		let req = test::TestRequest::get().uri("/v1/model").to_request();
		let status: ModelStatus = test::call_and_read_body_json(&app, req).await;
		assert_eq!(status, ModelStatus::Loaded { model: "echo".to_owned(), source: ModelSource::Primary });
	}
}
