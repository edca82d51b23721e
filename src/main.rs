use std::process::ExitCode;

#[actix_web::main]
async fn main() -> ExitCode {
    medleads_lib::run().await
}
