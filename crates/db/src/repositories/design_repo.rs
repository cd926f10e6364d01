//! Repository for design lookups and the post-generation image write-back.

use decora_core::types::DbId;
use sqlx::PgPool;

use crate::models::design::{Design, DesignForGeneration, DesignOptionRow, UpdateDesignImage};

const DESIGN_COLUMNS: &str = "d.id, d.user_id, d.category_id, d.name, d.status, \
    d.image_url, d.thumbnail_url, d.created_at, d.updated_at";

/// Read/write operations on designs as needed by generation.
pub struct DesignRepo;

impl DesignRepo {
    /// Load a design with its category and selected options, options sorted
    /// by their group's display order. Returns `None` if the design does not
    /// exist.
    pub async fn find_for_generation(
        pool: &PgPool,
        design_id: DbId,
    ) -> Result<Option<DesignForGeneration>, sqlx::Error> {
        let query = format!(
            "SELECT {DESIGN_COLUMNS}, c.name AS category_name, c.description AS category_description
             FROM designs d
             JOIN categories c ON c.id = d.category_id
             WHERE d.id = $1"
        );
        let header = sqlx::query_as::<_, DesignHeader>(&query)
            .bind(design_id)
            .fetch_optional(pool)
            .await?;

        let Some(header) = header else {
            return Ok(None);
        };

        let options = sqlx::query_as::<_, DesignOptionRow>(
            "SELECT g.name AS group_name,
                    g.slug AS group_slug,
                    g.display_order AS group_display_order,
                    v.label AS value_label,
                    v.prompt_hint
             FROM design_options dso
             JOIN option_values v ON v.id = dso.option_value_id
             JOIN option_groups g ON g.id = v.group_id
             WHERE dso.design_id = $1
             ORDER BY g.display_order ASC, g.name ASC",
        )
        .bind(design_id)
        .fetch_all(pool)
        .await?;

        Ok(Some(DesignForGeneration {
            design: header.design,
            category_name: header.category_name,
            category_description: header.category_description,
            options,
        }))
    }

    /// Write the generated image fields and status back to the design.
    /// Returns `true` if a row was updated.
    pub async fn update_design_image(
        pool: &PgPool,
        design_id: DbId,
        update: &UpdateDesignImage,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE designs SET
                image_url = $1,
                thumbnail_url = $2,
                status = $3,
                updated_at = NOW()
             WHERE id = $4",
        )
        .bind(&update.image_url)
        .bind(&update.thumbnail_url)
        .bind(&update.status)
        .bind(design_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Joined design + category row used by `find_for_generation`.
#[derive(sqlx::FromRow)]
struct DesignHeader {
    #[sqlx(flatten)]
    design: Design,
    category_name: String,
    category_description: Option<String>,
}
