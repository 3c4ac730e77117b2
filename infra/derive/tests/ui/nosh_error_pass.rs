use std::borrow::Cow;

#[nosh_derive::nosh_error]
pub enum PassError {
    #[error("Bad input{}: {message}", format_context(.context))]
    BadInput { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn main() {
    let err = PassError::BadInput { message: "x".into(), context: None };
    let _ = err.to_string();
}
