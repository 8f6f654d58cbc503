use drill_core::model::QuestionId;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn usize_to_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn i64_to_usize(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Corrupt(format!("invalid {field}: {v}")))
}

pub(crate) fn question_id_to_i64(id: QuestionId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("question_id overflow".into()))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    u64::try_from(v)
        .map(QuestionId::new)
        .map_err(|_| StorageError::Corrupt(format!("invalid question_id: {v}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_ids_are_corrupt() {
        assert!(matches!(
            question_id_from_i64(-1),
            Err(StorageError::Corrupt(_))
        ));
        assert_eq!(question_id_from_i64(12).unwrap(), QuestionId::new(12));
    }

    #[test]
    fn oversized_ids_do_not_fit_sqlite_integers() {
        assert!(question_id_to_i64(QuestionId::new(u64::MAX)).is_err());
    }
}
