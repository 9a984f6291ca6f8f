//! Registration repository for database operations on `registrations`.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use crate::{
    AppError, DbError, NewRegistrationParams, Registration, RegistrationFilter,
    UpdateRegistrationParams,
};

/// Column list shared by every query that materializes a [`Registration`].
const COLUMNS: &str = "id, person_type, status, name, company_name, cpf, cnpj, \
     technical_manager_name, technical_manager_cpf, email, phone, birth_date, \
     zip_code, street, number, complement, neighborhood, city, state, \
     education, institution, graduation_year, council_name, council_number, \
     specialty, area_of_action, experience_years, consent_given, consent_date, \
     internal_notes, approved_by, approved_at, rejected_by, rejected_at, \
     submitted_at, updated_at";

/// WHERE clause shared by `list` and `count` so both always agree.
///
/// Binds: `$1` status, `$2` education, `$3` person type, `$4` search
/// term, already passed through [`escape_like`]. A null bind disables
/// the corresponding condition.
const FILTER: &str = "($1::registration_status IS NULL OR status = $1) \
     AND ($2::text IS NULL OR education = $2) \
     AND ($3::person_type IS NULL OR person_type = $3) \
     AND ($4::text IS NULL \
          OR name ILIKE '%' || $4 || '%' \
          OR company_name ILIKE '%' || $4 || '%' \
          OR email ILIKE '%' || $4 || '%' \
          OR cpf ILIKE '%' || $4 || '%' \
          OR cnpj ILIKE '%' || $4 || '%')";

/// Escape LIKE metacharacters so the search term matches literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Registration repository for database operations on `registrations`.
#[derive(Debug, Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new registration and return the stored row.
    pub async fn create(
        &self,
        params: NewRegistrationParams<'_>,
    ) -> Result<Registration, AppError> {
        let sql = format!(
            "INSERT INTO registrations \
                    (person_type, name, company_name, cpf, cnpj, \
                     technical_manager_name, technical_manager_cpf, email, phone, \
                     birth_date, zip_code, street, number, complement, neighborhood, \
                     city, state, education, institution, graduation_year, \
                     council_name, council_number, specialty, area_of_action, \
                     experience_years, consent_given, consent_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
                     $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, Registration>(&sql)
            .bind(params.person_type)
            .bind(params.name)
            .bind(params.company_name)
            .bind(params.cpf)
            .bind(params.cnpj)
            .bind(params.technical_manager_name)
            .bind(params.technical_manager_cpf)
            .bind(params.email)
            .bind(params.phone)
            .bind(params.birth_date)
            .bind(params.zip_code)
            .bind(params.street)
            .bind(params.number)
            .bind(params.complement)
            .bind(params.neighborhood)
            .bind(params.city)
            .bind(params.state)
            .bind(params.education)
            .bind(params.institution)
            .bind(params.graduation_year)
            .bind(params.council_name)
            .bind(params.council_number)
            .bind(params.specialty)
            .bind(params.area_of_action)
            .bind(params.experience_years)
            .bind(params.consent_given)
            .bind(params.consent_date)
            .fetch_one(&self.pool)
            .await
            .map_err(DbError)?;
        Ok(row)
    }

    /// Get a registration by id.
    pub async fn get(&self, id: Uuid) -> Result<Registration, AppError> {
        let sql = format!("SELECT {COLUMNS} FROM registrations WHERE id = $1");
        sqlx::query_as::<_, Registration>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError)?
            .ok_or_else(|| AppError::not_found("Registration", id))
    }

    /// List registrations matching the filter, ordered and paginated.
    ///
    /// A null limit or offset leaves the corresponding clause inert,
    /// which is how exports fetch the full filtered set.
    pub async fn list(
        &self,
        filter: RegistrationFilter<'_>,
    ) -> Result<Vec<Registration>, AppError> {
        let sql = format!(
            "SELECT {COLUMNS} FROM registrations \
             WHERE {FILTER} \
             ORDER BY {order} \
             LIMIT $5 OFFSET $6",
            order = filter.order.as_sql()
        );
        let rows = sqlx::query_as::<_, Registration>(&sql)
            .bind(filter.status)
            .bind(filter.education)
            .bind(filter.person_type)
            .bind(filter.search.map(escape_like))
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError)?;
        Ok(rows)
    }

    /// Count registrations matching the filter, ignoring pagination.
    pub async fn count(&self, filter: RegistrationFilter<'_>) -> Result<i64, AppError> {
        let sql = format!("SELECT COUNT(*) FROM registrations WHERE {FILTER}");
        let total = sqlx::query_scalar::<_, i64>(&sql)
            .bind(filter.status)
            .bind(filter.education)
            .bind(filter.person_type)
            .bind(filter.search.map(escape_like))
            .fetch_one(&self.pool)
            .await
            .map_err(DbError)?;
        Ok(total)
    }

    /// Whether any registration with this CPF was submitted at or after
    /// the cutoff. Backs the resubmission cooldown.
    pub async fn recent_cpf_exists(
        &self,
        cpf: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS( \
                SELECT 1 FROM registrations \
                 WHERE cpf = $1 AND submitted_at >= $2)",
        )
        .bind(cpf)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError)?;
        Ok(exists)
    }

    /// Whether any registration with this CNPJ was submitted at or after
    /// the cutoff. Backs the resubmission cooldown.
    pub async fn recent_cnpj_exists(
        &self,
        cnpj: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS( \
                SELECT 1 FROM registrations \
                 WHERE cnpj = $1 AND submitted_at >= $2)",
        )
        .bind(cnpj)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(DbError)?;
        Ok(exists)
    }

    /// Update a registration with fully merged column values.
    ///
    /// Identity fields (person type, CPF, CNPJ) and consent are
    /// write-once and deliberately absent from the SET list.
    pub async fn update(
        &self,
        params: UpdateRegistrationParams<'_>,
    ) -> Result<Registration, AppError> {
        let sql = format!(
            "UPDATE registrations \
                SET status = $2, \
                    name = $3, \
                    company_name = $4, \
                    technical_manager_name = $5, \
                    technical_manager_cpf = $6, \
                    email = $7, \
                    phone = $8, \
                    birth_date = $9, \
                    zip_code = $10, \
                    street = $11, \
                    number = $12, \
                    complement = $13, \
                    neighborhood = $14, \
                    city = $15, \
                    state = $16, \
                    education = $17, \
                    institution = $18, \
                    graduation_year = $19, \
                    council_name = $20, \
                    council_number = $21, \
                    specialty = $22, \
                    area_of_action = $23, \
                    experience_years = $24, \
                    internal_notes = $25, \
                    approved_by = $26, \
                    approved_at = $27, \
                    rejected_by = $28, \
                    rejected_at = $29, \
                    updated_at = now() \
              WHERE id = $1 \
              RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Registration>(&sql)
            .bind(params.id)
            .bind(params.status)
            .bind(params.name)
            .bind(params.company_name)
            .bind(params.technical_manager_name)
            .bind(params.technical_manager_cpf)
            .bind(params.email)
            .bind(params.phone)
            .bind(params.birth_date)
            .bind(params.zip_code)
            .bind(params.street)
            .bind(params.number)
            .bind(params.complement)
            .bind(params.neighborhood)
            .bind(params.city)
            .bind(params.state)
            .bind(params.education)
            .bind(params.institution)
            .bind(params.graduation_year)
            .bind(params.council_name)
            .bind(params.council_number)
            .bind(params.specialty)
            .bind(params.area_of_action)
            .bind(params.experience_years)
            .bind(params.internal_notes)
            .bind(params.approved_by)
            .bind(params.approved_at)
            .bind(params.rejected_by)
            .bind(params.rejected_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError)?
            .ok_or_else(|| AppError::not_found("Registration", params.id))
    }

    /// Delete a registration. Documents cascade at the schema level.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM registrations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(DbError)?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Registration", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_covers_tax_ids_as_substrings() {
        // A reviewer pasting a middle fragment of a CPF or CNPJ must
        // still get a hit, same as for names and emails.
        assert!(FILTER.contains("cpf ILIKE '%' || $4 || '%'"));
        assert!(FILTER.contains("cnpj ILIKE '%' || $4 || '%'"));
        assert!(!FILTER.contains("LIKE $4 || '%'"));
    }

    #[test]
    fn escape_like_neutralizes_wildcards() {
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\dir"), "c:\\\\dir");
        assert_eq!(escape_like("12345678901"), "12345678901");
    }
}
