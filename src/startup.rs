use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::assistant::AssistantClient;
use crate::auth::AuthService;
use crate::email_client::EmailClient;
use crate::error::{AppError, ValidationError};
use crate::logger::RequestLogger;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    change_password, delete_user, get_current_user, health_check, list_users, login, logout,
    recover_password, refresh, register, summarize, test_token, update_current_user,
};

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(ValidationError::InvalidFormat(format!("request body ({})", err)))
            .into()
    })
}

pub fn run(
    listener: TcpListener,
    auth: AuthService,
    email_client: EmailClient,
    assistant: AssistantClient,
) -> Result<Server, std::io::Error> {
    let codec = auth.codec().clone();
    let auth = web::Data::new(auth);
    let email_client = web::Data::new(email_client);
    let assistant = web::Data::new(assistant);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(RequestLogger)
            .app_data(json_config())
            .app_data(auth.clone())
            .app_data(email_client.clone())
            .app_data(assistant.clone())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/v1")
                    .service(
                        web::scope("/auth")
                            .route("/register", web::post().to(register))
                            .route("/login", web::post().to(login))
                            .route("/refresh", web::post().to(refresh))
                            .route("/token/refresh", web::post().to(refresh))
                            .route("/logout", web::post().to(logout))
                            .route("/password/recover", web::post().to(recover_password))
                            .route("/password/change", web::post().to(change_password))
                            .service(
                                web::resource("/test")
                                    .wrap(JwtMiddleware::new(codec.clone()))
                                    .route(web::post().to(test_token)),
                            ),
                    )
                    .service(
                        web::scope("/users")
                            .wrap(JwtMiddleware::new(codec.clone()))
                            .route("", web::get().to(list_users))
                            .route("/me", web::get().to(get_current_user))
                            .route("/me", web::patch().to(update_current_user))
                            .route("/{id}", web::delete().to(delete_user)),
                    )
                    .service(
                        web::scope("/ai")
                            .wrap(JwtMiddleware::new(codec.clone()))
                            .route("/summarize", web::post().to(summarize)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
