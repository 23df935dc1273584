use crate::{config::Config, model::role::Role, models::Claims};
use crate::auth::jwt::verify_token;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
    pub company_id: u64,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    pub fn from_claims(claims: Claims) -> Option<Self> {
        Some(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role: Role::from_id(claims.role)?,
            company_id: claims.company_id,
            employee_id: claims.employee_id,
        })
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.role.is_manager() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("HR/Admin only"))
        }
    }

    /// Attendance can only be submitted for the caller's own employee record.
    pub fn require_own_employee(&self, employee_id: u64) -> actix_web::Result<()> {
        match self.employee_id {
            Some(own) if own == employee_id => Ok(()),
            Some(_) => Err(actix_web::error::ErrorForbidden("Attendance can only be recorded for yourself")),
            None => Err(actix_web::error::ErrorForbidden("No employee profile")),
        }
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(
                    actix_web::error::ErrorInternalServerError("Config missing"),
                ))
            }
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        match AuthUser::from_claims(claims) {
            Some(user) => ready(Ok(user)),
            None => ready(Err(ErrorUnauthorized("Invalid role"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "u".into(),
            role,
            company_id: 1,
            employee_id,
        }
    }

    #[test]
    fn only_managers_pass_the_admin_check() {
        assert!(user(Role::Admin, None).require_hr_or_admin().is_ok());
        assert!(user(Role::Hr, None).require_hr_or_admin().is_ok());
        assert!(user(Role::Employee, Some(42)).require_hr_or_admin().is_err());
    }

    #[test]
    fn employees_act_only_for_themselves() {
        let me = user(Role::Employee, Some(42));
        assert!(me.require_own_employee(42).is_ok());
        assert!(me.require_own_employee(43).is_err());
        assert!(user(Role::Admin, None).require_own_employee(42).is_err());
    }
}
