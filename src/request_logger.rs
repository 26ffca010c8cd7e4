//! Request logging middleware.
//!
//! One line per request under the `http` target. Conversion requests also
//! carry the uploaded filename and the artifact they produced, which handlers
//! record with [`record_conversion`].

use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::{Error, HttpMessage, HttpRequest};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::time::Instant;
use tracing::{info, warn};

/// Conversion details attached to a request for the access log.
#[derive(Debug, Clone, Default)]
struct ConversionLog {
    upload: String,
    artifact: Option<String>,
}

/// Attaches the upload name, and the artifact name once written, to the
/// request's log line.
pub(crate) fn record_conversion(req: &HttpRequest, upload: &str, artifact: Option<&str>) {
    req.extensions_mut().insert(ConversionLog {
        upload: upload.to_string(),
        artifact: artifact.map(str::to_string),
    });
}

/// Request logger middleware factory.
pub(crate) struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

/// Request logger middleware service.
pub(crate) struct RequestLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let peer = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            let status = res.status().as_u16();
            let elapsed_ms = start.elapsed().as_millis();

            let conversion = res
                .request()
                .extensions()
                .get::<ConversionLog>()
                .cloned()
                .unwrap_or_default();
            let upload = if conversion.upload.is_empty() {
                "-"
            } else {
                conversion.upload.as_str()
            };
            let artifact = conversion.artifact.as_deref().unwrap_or("-");

            if res.status().is_success() {
                info!(target: "http", %method, %path, %peer, status, elapsed_ms, upload, artifact, "served");
            } else {
                warn!(target: "http", %method, %path, %peer, status, elapsed_ms, upload, artifact, "failed");
            }

            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test, web};

    async fn convert_like(req: HttpRequest) -> HttpResponse {
        record_conversion(&req, "login.cy.js", Some("login.cy_playwright_20250307090501.spec.ts"));
        HttpResponse::Ok().finish()
    }

    #[actix_rt::test]
    async fn test_recorded_conversion_is_visible_to_middleware() {
        let app = test::init_service(
            App::new()
                .wrap(RequestLogger)
                .route("/convert", web::post().to(convert_like)),
        )
        .await;

        let resp =
            test::call_service(&app, test::TestRequest::post().uri("/convert").to_request()).await;
        assert!(resp.status().is_success());

        let logged = resp.request().extensions().get::<ConversionLog>().cloned().unwrap();
        assert_eq!(logged.upload, "login.cy.js");
        assert_eq!(
            logged.artifact.as_deref(),
            Some("login.cy_playwright_20250307090501.spec.ts")
        );
    }

    #[actix_rt::test]
    async fn test_other_routes_pass_through() {
        let app = test::init_service(
            App::new()
                .wrap(RequestLogger)
                .route("/health", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert!(resp.status().is_success());
        assert!(resp.request().extensions().get::<ConversionLog>().is_none());
    }
}
