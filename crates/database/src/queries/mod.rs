use planner::store::StoreError;

pub mod dgvi;
pub mod gvi;
pub mod road;
pub mod transit;

pub(crate) fn convert_error(why: sqlx::Error) -> StoreError {
    match why {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Other(Box::new(why)),
    }
}
