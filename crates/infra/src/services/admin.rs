//! Account administration: sign-up, company creation, and the admin-driven
//! invite / update / delete / list workflows.

use chrono::Utc;
use tracing::info;

use vocalyx_auth::{
    Company, NewCompany, PasswordHasher, ProfileUpdate, Registration, User, ensure_same_company,
    user::validate_email,
};
use vocalyx_core::{DomainError, UserId};

use super::error::ServiceResult;
use super::views::{UserView, company_user_views, user_view};
use super::{require_password, scoped_admin, target_user};
use crate::directory::{CompanyAttach, Directory};
use crate::mail::{MailMessage, Mailer, deliver_best_effort};

/// Self-registration request (plaintext password, hashed here).
#[derive(Debug, Clone)]
pub struct SignUp {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Invitation request from a company admin.
#[derive(Debug, Clone)]
pub struct Invitation {
    pub email: String,
    pub temporary_password: String,
}

/// Sender and link used in invitation mails.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub from: String,
    pub login_url: String,
}

#[derive(Debug, Clone)]
pub struct AdminService<D, M> {
    directory: D,
    mailer: M,
    hasher: PasswordHasher,
    mail: MailSettings,
}

impl<D: Directory, M: Mailer> AdminService<D, M> {
    pub fn new(directory: D, mailer: M, hasher: PasswordHasher, mail: MailSettings) -> Self {
        Self {
            directory,
            mailer,
            hasher,
            mail,
        }
    }

    /// Create a self-registered account: an ADMIN without a company.
    pub async fn register(&self, input: SignUp) -> ServiceResult<UserView> {
        require_password("password", &input.password)?;
        let email = validate_email(&input.email)?;
        if self.directory.user_by_email(&email).await?.is_some() {
            return Err(DomainError::EmailTaken.into());
        }

        let user = User::register(
            Registration {
                first_name: input.first_name,
                last_name: input.last_name,
                email,
                password_hash: self.hasher.hash(&input.password)?,
            },
            Utc::now(),
        )?;
        self.directory.insert_user(&user).await?;

        info!(user_id = %user.id, "user registered");
        Ok(UserView::new(&user, None, None))
    }

    /// Create a company and its workspace and scope `user_id` to both.
    pub async fn create_company(&self, user_id: UserId, fields: NewCompany) -> ServiceResult<UserView> {
        let mut user = target_user(&self.directory, user_id).await?;
        if user.is_scoped() {
            return Err(DomainError::AlreadyHasTenant.into());
        }

        let now = Utc::now();
        let (company, workspace) = Company::establish(fields, user.id, now)?;
        user.attach_company(&company, &workspace, now)?;

        match self.directory.establish_company(&user, &company, &workspace).await? {
            CompanyAttach::Attached => {}
            CompanyAttach::AlreadyScoped => return Err(DomainError::AlreadyHasTenant.into()),
            CompanyAttach::MissingUser => return Err(DomainError::not_found("user").into()),
        }

        info!(
            user_id = %user.id,
            company_id = %company.id,
            workspace_id = %workspace.id,
            "company created and assigned"
        );
        Ok(UserView::new(&user, Some(&company), None))
    }

    /// Create a USER account in the admin's company and mail the credentials.
    ///
    /// Mail failure is logged and does not undo the account.
    pub async fn invite_user(&self, admin_id: UserId, invitation: Invitation) -> ServiceResult<UserView> {
        let (admin, company_id) = scoped_admin(&self.directory, admin_id).await?;
        let email = validate_email(&invitation.email)?;
        require_password("temporary password", &invitation.temporary_password)?;
        if self.directory.user_by_email(&email).await?.is_some() {
            return Err(DomainError::EmailTaken.into());
        }

        let company = self
            .directory
            .company(company_id)
            .await?
            .ok_or(DomainError::not_found("company"))?;
        let hash = self.hasher.hash(&invitation.temporary_password)?;
        let user = User::invited(&admin, &email, hash, Utc::now())?;
        self.directory.insert_user(&user).await?;

        info!(user_id = %user.id, company_id = %company_id, admin_id = %admin.id, "user invited");

        deliver_best_effort(
            &self.mailer,
            invitation_mail(&self.mail, &admin, &company, &email, &invitation.temporary_password),
        )
        .await;

        Ok(UserView::new(&user, Some(&company), None))
    }

    /// Edit a user of the admin's company. `custom_role_id: None` clears the role.
    pub async fn update_user(
        &self,
        admin_id: UserId,
        target_id: UserId,
        update: ProfileUpdate,
    ) -> ServiceResult<UserView> {
        let (admin, company_id) = scoped_admin(&self.directory, admin_id).await?;
        let mut target = target_user(&self.directory, target_id).await?;
        ensure_same_company(company_id, &target)?;

        let email = validate_email(&update.email)?;
        if email != target.email && self.directory.user_by_email(&email).await?.is_some() {
            return Err(DomainError::EmailTaken.into());
        }

        if let Some(role_id) = update.custom_role_id {
            let role = self
                .directory
                .role(role_id)
                .await?
                .ok_or(DomainError::not_found("role"))?;
            ensure_same_company(company_id, &role)?;
        }

        target.apply_profile(ProfileUpdate { email, ..update }, Utc::now())?;
        if !self.directory.update_profile(&target).await? {
            return Err(DomainError::not_found("user").into());
        }

        info!(
            user_id = %target.id,
            admin_id = %admin.id,
            custom_role_id = ?target.custom_role_id,
            "user updated"
        );
        user_view(&self.directory, &target).await
    }

    /// Remove a user of the admin's company; admins cannot remove themselves.
    pub async fn delete_user(&self, admin_id: UserId, target_id: UserId) -> ServiceResult<()> {
        let (admin, company_id) = scoped_admin(&self.directory, admin_id).await?;
        let target = target_user(&self.directory, target_id).await?;
        ensure_same_company(company_id, &target)?;
        if target.id == admin.id {
            return Err(DomainError::SelfDeleteForbidden.into());
        }

        if !self.directory.delete_user(target.id).await? {
            return Err(DomainError::not_found("user").into());
        }
        info!(user_id = %target.id, admin_id = %admin.id, "user deleted");
        Ok(())
    }

    /// Every profile in the admin's company, oldest first.
    pub async fn list_company_users(&self, admin_id: UserId) -> ServiceResult<Vec<UserView>> {
        let (_, company_id) = scoped_admin(&self.directory, admin_id).await?;
        let company = self
            .directory
            .company(company_id)
            .await?
            .ok_or(DomainError::not_found("company"))?;
        let users = self.directory.users_in_company(company_id).await?;
        company_user_views(&self.directory, &company, &users).await
    }

    /// The caller's own profile.
    pub async fn profile(&self, user_id: UserId) -> ServiceResult<UserView> {
        let user = target_user(&self.directory, user_id).await?;
        user_view(&self.directory, &user).await
    }
}

fn invitation_mail(
    settings: &MailSettings,
    admin: &User,
    company: &Company,
    to: &str,
    temporary_password: &str,
) -> MailMessage {
    MailMessage {
        from: settings.from.clone(),
        to: to.to_string(),
        subject: format!("You're invited to {} workspace", company.name),
        body: format!(
            "You have been invited by {} to join {} workspace.\n\n\
             Temporary Password: {}\n\
             Login at: {}\n\n\
             Please change your password after first login.",
            admin.email, company.name, temporary_password, settings.login_url
        ),
    }
}
