use std::future::{Ready, ready};

use actix_session::{Session, SessionExt, SessionGetError, SessionInsertError};
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::domain::UserType;

pub struct TypedSession(Session);

impl TypedSession {
    const USER_ID_KEY: &'static str = "user_id";
    const USER_TYPE_KEY: &'static str = "user_type";

    pub fn renew(&self) {
        self.0.renew();
    }

    pub fn insert_user(&self, user_id: Uuid, user_type: UserType) -> Result<(), SessionInsertError> {
        self.0.insert(Self::USER_ID_KEY, user_id)?;
        self.0.insert(Self::USER_TYPE_KEY, user_type.as_str())
    }

    pub fn get_user_id(&self) -> Result<Option<Uuid>, SessionGetError> {
        self.0.get(Self::USER_ID_KEY)
    }

    pub fn get_user_type(&self) -> Result<Option<UserType>, SessionGetError> {
        let stored: Option<String> = self.0.get(Self::USER_TYPE_KEY)?;
        Ok(stored.and_then(|raw| UserType::parse(&raw).ok()))
    }

    pub fn logout(self) {
        self.0.purge()
    }
}

impl FromRequest for TypedSession {
    type Error = <Session as FromRequest>::Error;
    type Future = Ready<Result<TypedSession, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Ok(TypedSession(req.get_session())))
    }
}
