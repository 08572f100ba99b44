use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, middleware::Logger, post, web};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::ExtractorConfig;
use crate::error::TranscriptError;
use crate::service::TranscriptService;
use crate::transcript::{OutputFormat, Segment, TranscriptData};
use crate::video::parse_video_id;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRequest {
    pub action: String,
    pub video_id: Option<String>,
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub include_timestamps: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResponse {
    pub transcript_data: TranscriptPayload,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscriptPayload {
    Error {
        error: String,
    },
    #[serde(rename_all = "camelCase")]
    Transcript {
        video_id: String,
        segments: Vec<Segment>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        formatted: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
    },
}

impl TranscriptPayload {
    fn from_error(error: &TranscriptError) -> Self {
        let error = match error {
            TranscriptError::InvalidVideoId(_) => error.to_string(),
            other => format!("Failed to get transcript data: {other}"),
        };
        TranscriptPayload::Error { error }
    }
}

pub struct AppState {
    pub service: TranscriptService,
}

#[get("/api/v1/health")]
pub async fn health_check() -> impl Responder {
    debug!("Health check endpoint called");
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "message": "Caption extraction service is running"
    }))
}

#[post("/api/v1/transcript")]
pub async fn get_transcript(
    data: web::Data<AppState>,
    request: web::Json<TranscriptRequest>,
) -> impl Responder {
    let request = request.into_inner();
    debug!("Transcript request received: {request:?}");

    if request.action != "getTranscript" {
        warn!("Unknown action: {}", request.action);
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Unknown action: {}", request.action)
        }));
    }

    let outcome = match request.video_id.as_deref().map(parse_video_id) {
        Some(Ok(video_id)) => data.service.get_transcript(&video_id).await,
        Some(Err(e)) => Err(e),
        None => Err(TranscriptError::InvalidVideoId(String::new())),
    };

    let payload = match outcome {
        Ok(mut transcript) => {
            info!(
                "Transcript extracted: {} segments for {}",
                transcript.segments.len(),
                transcript.video_id
            );
            render(&mut transcript, request.format, request.include_timestamps)
        }
        Err(e) => {
            error!("Error getting transcript: {e}");
            TranscriptPayload::from_error(&e)
        }
    };

    HttpResponse::Ok().json(TranscriptResponse {
        transcript_data: payload,
    })
}

fn render(
    transcript: &mut TranscriptData,
    format: Option<OutputFormat>,
    include_timestamps: bool,
) -> TranscriptPayload {
    let (formatted, filename) = match format {
        Some(format) => (
            Some(transcript.formatted(format, include_timestamps).to_string()),
            Some(transcript.filename(format)),
        ),
        None => (None, None),
    };

    TranscriptPayload::Transcript {
        video_id: transcript.video_id.clone(),
        segments: transcript.segments.clone(),
        formatted,
        filename,
    }
}

pub async fn run_server(host: String, port: u16, config: ExtractorConfig) -> std::io::Result<()> {
    info!("Starting caption extraction service");
    info!(
        "Using configuration: base_url={}, language={}, cache_path={:?}",
        config.base_url, config.language, config.cache_path
    );

    let service = match TranscriptService::from_config(&config, true).await {
        Ok(service) => service,
        Err(e) => {
            error!("Failed to initialize transcript service: {e:#}");
            std::process::exit(1);
        }
    };

    let app_state = web::Data::new(AppState { service });

    info!("Starting HTTP server on {host}:{port}");

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .app_data(web::JsonConfig::default().limit(64 * 1024))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health_check)
            .service(get_transcript)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
