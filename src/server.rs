//! HTTP shell: one page, one conversion per form post, artifact downloads.
//!
//! Routes:
//! - `GET /`: upload form
//! - `POST /convert`: multipart upload (`file` field), renders the result page
//! - `GET /download/{filename}`: serves a written artifact as an attachment
//! - `GET /health`: liveness check

use crate::{
    client::CompletionClient,
    config::Config,
    error::{Error, Result},
    pipeline::{Conversion, Converter},
    request_logger::{RequestLogger, record_conversion},
    template::TemplateEngine,
    upload::UploadedScript,
    view::PageView,
    writer::ArtifactWriter,
};
use actix_multipart::Multipart;
use actix_web::{
    App, HttpRequest, HttpResponse, HttpServer, ResponseError, get,
    http::{
        StatusCode,
        header::{ContentDisposition, ContentType, DispositionParam, DispositionType},
    },
    post, web,
};
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{info, warn};

/// Name of the multipart field carrying the test file.
pub const UPLOAD_FIELD: &str = "file";

/// Shared state for every worker.
#[derive(Debug)]
pub struct AppState {
    converter: Arc<Converter>,
    templates: Arc<TemplateEngine>,
    model: String,
    max_upload_size: usize,
}

impl AppState {
    /// Builds the state from configuration and a completion client.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration validation or template registration
    /// fails.
    pub fn new(config: &Config, client: Arc<dyn CompletionClient>) -> Result<Self> {
        config.validate()?;

        let templates = Arc::new(TemplateEngine::new()?);
        let converter = Converter::from_parts(
            Arc::clone(&templates),
            client,
            ArtifactWriter::new(config),
        );

        Ok(Self {
            converter: Arc::new(converter),
            templates,
            model: config.model.clone(),
            max_upload_size: config.max_upload_size,
        })
    }

    fn page(&self) -> PageView<'_> {
        PageView::empty(&self.model, self.max_upload_size)
    }

    fn render(&self, status: StatusCode, view: &PageView<'_>) -> Result<HttpResponse> {
        let html = self.templates.render_page(view)?;
        Ok(HttpResponse::build(status)
            .content_type(ContentType::html())
            .body(html))
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidUtf8 { .. } | Self::UnsupportedFile { .. } | Self::InvalidUpload { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Generation { .. } => StatusCode::BAD_GATEWAY,
            Self::Io { .. } | Self::Template { .. } | Self::Config { .. } | Self::MissingSecret { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type(ContentType::plaintext())
            .body(self.user_message())
    }
}

/// Registers the shell's routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index)
        .service(convert)
        .service(download)
        .service(health);
}

/// Runs the HTTP server until shutdown.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn serve(config: &Config, state: AppState) -> std::io::Result<()> {
    let state = web::Data::new(state);
    let bind_address = config.bind_address();

    info!(
        "Starting server at http://{} ({} workers, output dir {})",
        bind_address,
        config.workers,
        config.output_dir.display()
    );

    HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(state.clone())
            .configure(configure)
    })
    .workers(config.workers)
    .bind(&bind_address)?
    .run()
    .await
}

#[get("/")]
async fn index(state: web::Data<AppState>) -> Result<HttpResponse> {
    state.render(StatusCode::OK, &state.page())
}

#[post("/convert")]
async fn convert(
    req: HttpRequest,
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    let upload = match read_upload(&mut payload, state.max_upload_size).await {
        Ok(upload) => upload,
        Err(e) => return rejection_page(&state, &e),
    };

    record_conversion(&req, &upload.filename, None);

    if let Err(e) = upload.ensure_supported() {
        return rejection_page(&state, &e);
    }

    info!(
        "Received {} ({} bytes)",
        upload.filename,
        upload.size_bytes()
    );

    let converter = Arc::clone(&state.converter);
    let (upload, outcome) = web::block(move || {
        let outcome = converter.convert(&upload);
        (upload, outcome)
    })
    .await
    .map_err(|e| Error::generation(format!("Conversion task did not complete: {e}")))?;

    match outcome {
        Ok(conversion) => {
            record_conversion(&req, &upload.filename, Some(&conversion.artifact.filename));
            conversion_page(&state, &conversion)
        }
        Err(e) if e.is_rejected_upload() => rejection_page(&state, &e),
        Err(e) => {
            warn!("Conversion of {} failed: {e}", upload.filename);

            // The source decoded fine, so keep it on screen next to the error
            let source = upload.decode()?;
            let view = state
                .page()
                .with_source(&upload.filename, &source)
                .with_error(e.user_message());
            state.render(e.status_code(), &view)
        }
    }
}

#[get("/download/{filename}")]
async fn download(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse> {
    let filename = path.into_inner();

    let Some(artifact_path) = state.converter.writer().resolve(&filename) else {
        return Ok(HttpResponse::NotFound()
            .content_type(ContentType::plaintext())
            .body("Converted file not found."));
    };

    let bytes = web::block(move || {
        std::fs::read(&artifact_path).map_err(|e| Error::io(&artifact_path, e))
    })
    .await
    .map_err(|e| Error::config(format!("Download task did not complete: {e}")))??;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(bytes))
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::plaintext())
        .body("ok")
}

fn conversion_page(state: &AppState, conversion: &Conversion) -> Result<HttpResponse> {
    let view = state.page().with_conversion(conversion);
    state.render(StatusCode::OK, &view)
}

fn rejection_page(state: &AppState, error: &Error) -> Result<HttpResponse> {
    warn!("Upload rejected: {error}");
    let view = state.page().with_error(error.user_message());
    state.render(error.status_code(), &view)
}

/// Reads the `file` field of the form, enforcing the size limit.
async fn read_upload(payload: &mut Multipart, limit: usize) -> Result<UploadedScript> {
    let mut upload = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| Error::invalid_upload(format!("malformed form data ({e})")))?;

        let filename = field
            .content_disposition()
            .filter(|cd| cd.get_name() == Some(UPLOAD_FIELD))
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| Error::invalid_upload(format!("interrupted upload ({e})")))?;

            // Other fields are drained but never buffered
            if filename.is_none() {
                continue;
            }

            if bytes.len() + chunk.len() > limit {
                return Err(Error::upload_too_large(bytes.len() + chunk.len(), limit));
            }
            bytes.extend_from_slice(&chunk);
        }

        if let Some(filename) = filename
            && upload.is_none()
        {
            upload = Some(UploadedScript::new(filename, bytes));
        }
    }

    match upload {
        Some(upload) if !upload.filename.is_empty() => Ok(upload),
        _ => Err(Error::invalid_upload("no file was selected")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::StubClient;
    use actix_web::{body::to_bytes, test};

    const BOUNDARY: &str = "----cy2pwBoundary";

    fn multipart_body(filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/javascript\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn state(output_dir: &std::path::Path, client: Arc<StubClient>, limit: usize) -> AppState {
        let config = Config::builder()
            .api_key("sk-test")
            .output_dir(output_dir)
            .max_upload_size(limit)
            .build()
            .unwrap();
        AppState::new(&config, client).unwrap()
    }

    #[::core::prelude::v1::test]
    fn test_status_codes() {
        assert_eq!(
            Error::invalid_utf8("a.js").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::upload_too_large(2, 1).status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            Error::generation("x").status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::io("/tmp", std::io::Error::other("x")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[actix_rt::test]
    async fn test_upload_over_limit_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let client = StubClient::returning("RESULT");
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(temp.path(), client.clone(), 8)))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/convert")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart_body("big.cy.js", b"cy.visit('/long/path')"))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(client.calls(), 0);
    }

    #[actix_rt::test]
    async fn test_unsupported_extension_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let client = StubClient::returning("RESULT");
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(temp.path(), client.clone(), 1024)))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/convert")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart_body("notes.py", b"print('hi')"))
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(resp.into_body()).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("is not a .js or .ts file"));
        assert_eq!(client.calls(), 0);
    }

    #[actix_rt::test]
    async fn test_health() {
        let temp = assert_fs::TempDir::new().unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(
                    temp.path(),
                    StubClient::returning("RESULT"),
                    1024,
                )))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }
}
