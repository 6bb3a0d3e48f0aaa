use std::sync::Arc;

use anyhow::Context;

use vocalyx_auth::{PasswordHasher, SessionIssuer};
use vocalyx_infra::config::AppConfig;
use vocalyx_infra::directory::{Directory, InMemoryDirectory, PostgresDirectory};
use vocalyx_infra::mail::{LogMailer, Mailer};
use vocalyx_infra::services::{
    AdminService, CredentialService, MailSettings, PasswordResetService, ResetMailSettings,
    RoleService,
};

pub type SharedDirectory = Arc<dyn Directory>;
pub type SharedMailer = Arc<dyn Mailer>;

/// Every application service, sharing one directory and one mailer.
pub struct AppServices {
    pub admin: AdminService<SharedDirectory, SharedMailer>,
    pub roles: RoleService<SharedDirectory>,
    pub credentials: CredentialService<SharedDirectory>,
    pub resets: PasswordResetService<SharedDirectory, SharedMailer>,
}

impl AppServices {
    pub fn new(config: &AppConfig, directory: SharedDirectory, mailer: SharedMailer) -> Self {
        let hasher = PasswordHasher::new(config.password_pepper.clone());
        let issuer = SessionIssuer::new(config.jwt_secret.as_bytes(), config.session_ttl());

        Self {
            admin: AdminService::new(
                directory.clone(),
                mailer.clone(),
                hasher.clone(),
                MailSettings {
                    from: config.mail_from.clone(),
                    login_url: config.login_url.clone(),
                },
            ),
            roles: RoleService::new(directory.clone()),
            credentials: CredentialService::new(directory.clone(), hasher.clone(), issuer),
            resets: PasswordResetService::new(
                directory,
                mailer,
                hasher,
                ResetMailSettings {
                    from: config.mail_from.clone(),
                    reset_url: config.reset_url.clone(),
                    ttl: config.reset_ttl(),
                },
            ),
        }
    }
}

/// Wire services for `config`: Postgres when `DATABASE_URL` is set, in-memory otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let directory: SharedDirectory = match &config.database_url {
        Some(url) => {
            let directory = PostgresDirectory::connect(url)
                .await
                .context("failed to connect to Postgres")?;
            directory
                .migrate()
                .await
                .context("failed to apply directory schema")?;
            tracing::info!("using Postgres directory");
            Arc::new(directory)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory directory (data is lost on restart)");
            InMemoryDirectory::arc()
        }
    };

    Ok(AppServices::new(config, directory, Arc::new(LogMailer)))
}
