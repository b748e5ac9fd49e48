use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use physique_trainer::{
    ImageRole, OllamaConfig, OllamaModel, Trainer, TrainerError,
    ollama::messages::{GenerateRequest, GenerateResponse},
};
use std::{
    net::SocketAddr,
    path::Path,
    sync::{Arc, Mutex},
};

const PLAN: &str = "Monday: back squat 5x5\nWednesday: bench press 5x5\nFriday: deadlift 1x5\n";
const ASSESSMENT: &str = "weak posterior chain";

type Requests = Arc<Mutex<Vec<GenerateRequest>>>;

// Replies with the fixed assessment to image requests and echoes text prompts.
async fn generate(
    State(requests): State<Requests>,
    Json(request): Json<GenerateRequest>,
) -> Json<GenerateResponse> {
    let response = if request.images.is_empty() {
        request.prompt.clone()
    } else {
        ASSESSMENT.to_string()
    };
    let model = request.model.clone();
    requests.lock().unwrap().push(request);

    Json(GenerateResponse {
        model,
        response,
        done: true,
        total_duration: None,
    })
}

async fn unavailable(
    State(requests): State<Requests>,
    Json(request): Json<GenerateRequest>,
) -> StatusCode {
    requests.lock().unwrap().push(request);
    StatusCode::SERVICE_UNAVAILABLE
}

struct MockServer {
    addr: SocketAddr,
    requests: Requests,
}

impl MockServer {
    fn start() -> Self {
        Self::with_router(|requests| {
            Router::new()
                .route("/api/generate", post(generate))
                .with_state(requests)
        })
    }

    fn failing() -> Self {
        Self::with_router(|requests| {
            Router::new()
                .route("/api/generate", post(unavailable))
                .with_state(requests)
        })
    }

    fn with_router(app: impl FnOnce(Requests) -> Router + Send + 'static) -> Self {
        let requests = Requests::default();
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn({
            let requests = requests.clone();
            move || {
                let runtime = tokio::runtime::Runtime::new().unwrap();
                runtime.block_on(async move {
                    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
                    tx.send(listener.local_addr().unwrap()).unwrap();
                    axum::serve(listener, app(requests)).await.unwrap();
                });
            }
        });

        Self {
            addr: rx.recv().unwrap(),
            requests,
        }
    }

    fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn model(&self, name: &str) -> OllamaModel {
        OllamaModel::new(OllamaConfig::new(self.endpoint(), name)).unwrap()
    }

    fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn write_images(dir: &Path, sizes: [(u32, u32); 3]) {
    for (role, (width, height)) in ImageRole::ALL.into_iter().zip(sizes) {
        image::RgbImage::new(width, height)
            .save(dir.join(role.file_name()))
            .unwrap();
    }
}

fn write_plan(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("plan.txt");
    std::fs::write(&path, PLAN).unwrap();
    path
}

#[test]
fn augments_plan_through_the_server() {
    let server = MockServer::start();
    let dir = tempfile::tempdir().unwrap();
    write_images(dir.path(), [(640, 480), (480, 640), (1024, 1024)]);
    let plan_path = write_plan(dir.path());

    let mut trainer = Trainer::new(server.model("llava"), server.model("gpt-oss:20b"));
    let outcome = trainer.run_from_files(dir.path(), &plan_path).unwrap();

    assert!(outcome.plan.as_str().contains(PLAN.trim()));
    assert!(outcome.plan.as_str().contains("posterior chain"));

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].model, "llava");
    assert_eq!(requests[0].images.len(), 3);
    assert!(!requests[0].stream);
    assert_eq!(requests[1].model, "gpt-oss:20b");
    assert!(requests[1].images.is_empty());
    assert!(requests[1].prompt.contains(ASSESSMENT));
}

#[test]
fn sends_original_image_bytes() {
    use base64::{Engine, engine::general_purpose::STANDARD};

    let server = MockServer::start();
    let dir = tempfile::tempdir().unwrap();
    write_images(dir.path(), [(64, 64), (32, 32), (16, 16)]);
    let plan_path = write_plan(dir.path());

    Trainer::new(server.model("llava"), server.model("gpt-oss:20b"))
        .run_from_files(dir.path(), &plan_path)
        .unwrap();

    let images = &server.requests()[0].images;
    for (role, encoded) in ImageRole::ALL.into_iter().zip(images) {
        let bytes = std::fs::read(dir.path().join(role.file_name())).unwrap();
        assert_eq!(encoded, &STANDARD.encode(bytes));
    }
}

#[test]
fn reruns_are_byte_identical() {
    let server = MockServer::start();
    let dir = tempfile::tempdir().unwrap();
    write_images(dir.path(), [(320, 240), (320, 240), (320, 240)]);
    let plan_path = write_plan(dir.path());

    let run = || {
        Trainer::new(server.model("llava"), server.model("gpt-oss:20b"))
            .run_from_files(dir.path(), &plan_path)
            .unwrap()
            .plan
            .into_inner()
    };

    assert_eq!(run().into_bytes(), run().into_bytes());
}

#[test]
fn oversized_image_fails_before_any_request() {
    let server = MockServer::start();
    let dir = tempfile::tempdir().unwrap();
    write_images(dir.path(), [(640, 480), (1025, 600), (640, 480)]);
    let plan_path = write_plan(dir.path());

    let err = Trainer::new(server.model("llava"), server.model("gpt-oss:20b"))
        .run_from_files(dir.path(), &plan_path)
        .unwrap_err();

    assert!(matches!(
        err,
        TrainerError::InvalidImage {
            role: ImageRole::Side,
            ..
        }
    ));
    assert!(server.requests().is_empty());
}

#[test]
fn missing_back_image_fails_before_any_request() {
    let server = MockServer::start();
    let dir = tempfile::tempdir().unwrap();
    write_images(dir.path(), [(640, 480), (640, 480), (640, 480)]);
    std::fs::remove_file(dir.path().join("image_back.jpeg")).unwrap();
    let plan_path = write_plan(dir.path());

    let err = Trainer::new(server.model("llava"), server.model("gpt-oss:20b"))
        .run_from_files(dir.path(), &plan_path)
        .unwrap_err();

    assert!(matches!(
        err,
        TrainerError::InvalidImage {
            role: ImageRole::Back,
            ..
        }
    ));
    assert!(server.requests().is_empty());
}

#[test]
fn refused_vision_connection_never_reaches_text_model() {
    let text_server = MockServer::start();
    let dir = tempfile::tempdir().unwrap();
    write_images(dir.path(), [(640, 480), (640, 480), (640, 480)]);
    let plan_path = write_plan(dir.path());

    // bind and drop to get a port nobody listens on
    let closed = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let vision =
        OllamaModel::new(OllamaConfig::new(format!("http://{closed}"), "llava")).unwrap();

    let err = Trainer::new(vision, text_server.model("gpt-oss:20b"))
        .run_from_files(dir.path(), &plan_path)
        .unwrap_err();

    assert!(
        matches!(err, TrainerError::ModelUnavailable { ref model, .. } if model == "llava")
    );
    assert!(text_server.requests().is_empty());
}

#[test]
fn error_status_is_model_unavailable() {
    let server = MockServer::failing();
    let dir = tempfile::tempdir().unwrap();
    write_images(dir.path(), [(640, 480), (640, 480), (640, 480)]);
    let plan_path = write_plan(dir.path());

    let err = Trainer::new(server.model("llava"), server.model("gpt-oss:20b"))
        .run_from_files(dir.path(), &plan_path)
        .unwrap_err();

    assert!(matches!(err, TrainerError::ModelUnavailable { .. }));
    assert!(err.to_string().contains("503"));
    // the failed vision call is the only one
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn empty_plan_file_is_invalid_input() {
    let server = MockServer::start();
    let dir = tempfile::tempdir().unwrap();
    write_images(dir.path(), [(640, 480), (640, 480), (640, 480)]);
    let plan_path = dir.path().join("plan.txt");
    std::fs::write(&plan_path, "\n\n").unwrap();

    let err = Trainer::new(server.model("llava"), server.model("gpt-oss:20b"))
        .run_from_files(dir.path(), &plan_path)
        .unwrap_err();

    assert!(matches!(err, TrainerError::InvalidInput(_)));
    assert!(server.requests().is_empty());
}
