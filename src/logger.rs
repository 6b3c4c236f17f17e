use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error,
};
use futures::future::LocalBoxFuture;
use log::{info, warn};
use std::rc::Rc;
use std::time::Instant;
use uuid::Uuid;

use crate::error::{AppError, ErrorHandler};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Access log middleware
///
/// Logs method, path, status and latency of every request and tags the
/// response with an `x-request-id` header. An `AppError` behind the response
/// is logged once, under that same id. Errors raised by inner middleware
/// (e.g. the token guard) are rendered here so they get the header too.
/// Headers and bodies are never logged, so bearer tokens and passwords stay
/// out of the logs.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RequestLoggerService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestLoggerService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start_time = Instant::now();
        let request_id = Uuid::new_v4().to_string();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let http_req = req.request().clone();

        info!("[{}] Request started: {} {}", request_id, method, path);

        let service = self.service.clone();

        Box::pin(async move {
            let mut res = match service.call(req).await {
                Ok(res) => res.map_into_left_body(),
                Err(e) => ServiceResponse::from_err(e, http_req).map_into_right_body(),
            };

            if let Some(error) = res.response().error() {
                match error.as_error::<AppError>() {
                    Some(app_error) => app_error.log_error(&request_id),
                    None => warn!("[{}] Request failed: {}", request_id, error),
                }
            }

            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut()
                    .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
            }

            let elapsed = start_time.elapsed();
            let status = res.status();
            let message = format!(
                "[{}] Request completed: {} {} - Status: {} ({}ms)",
                request_id,
                method,
                path,
                status.as_u16(),
                elapsed.as_millis()
            );
            if status.is_server_error() {
                warn!("{}", message);
            } else {
                info!("{}", message);
            }

            Ok(res)
        })
    }
}
