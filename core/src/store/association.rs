use super::{AssociationRow, EventRow, RegStore, RunRow};
use crate::{
    error::RegResult,
    features::FeatureSet,
    types::{AssocId, EventId, RunId},
};
use rusqlite::{params, OptionalExtension};

impl RegStore {
    // ── Association ───────────────────────────────────────────────

    pub fn insert_association(&self, a: &AssociationRow) -> RegResult<AssocId> {
        self.conn.execute(
            "INSERT INTO association (id, name, slug, main_mail) VALUES (?1, ?2, ?3, ?4)",
            params![a.id, a.name, a.slug, a.main_mail],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_association(&self, assoc_id: AssocId) -> RegResult<Option<AssociationRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, slug, main_mail FROM association WHERE id = ?1",
                params![assoc_id],
                |row| {
                    Ok(AssociationRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        slug: row.get(2)?,
                        main_mail: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn add_association_feature(&self, assoc_id: AssocId, slug: &str) -> RegResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO association_feature (assoc_id, slug) VALUES (?1, ?2)",
            params![assoc_id, slug],
        )?;
        Ok(())
    }

    pub fn set_association_config(
        &self,
        assoc_id: AssocId,
        name: &str,
        value: &str,
    ) -> RegResult<()> {
        self.conn.execute(
            "INSERT INTO association_config (assoc_id, name, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(assoc_id, name) DO UPDATE SET value = excluded.value",
            params![assoc_id, name, value],
        )?;
        Ok(())
    }

    pub fn association_config_value(
        &self,
        assoc_id: AssocId,
        name: &str,
    ) -> RegResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM association_config WHERE assoc_id = ?1 AND name = ?2",
                params![assoc_id, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    // ── Event ─────────────────────────────────────────────────────

    pub fn insert_event(&self, e: &EventRow) -> RegResult<EventId> {
        self.conn.execute(
            "INSERT INTO event (id, assoc_id, parent_id, name, slug, max_pg, max_filler,
                                max_waiting, register_link)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                e.id,
                e.assoc_id,
                e.parent_id,
                e.name,
                e.slug,
                e.max_pg,
                e.max_filler,
                e.max_waiting,
                e.register_link,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_event(&self, event_id: EventId) -> RegResult<Option<EventRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, assoc_id, parent_id, name, slug, max_pg, max_filler,
                        max_waiting, register_link
                 FROM event WHERE id = ?1",
                params![event_id],
                |row| {
                    Ok(EventRow {
                        id: row.get(0)?,
                        assoc_id: row.get(1)?,
                        parent_id: row.get(2)?,
                        name: row.get(3)?,
                        slug: row.get(4)?,
                        max_pg: row.get(5)?,
                        max_filler: row.get(6)?,
                        max_waiting: row.get(7)?,
                        register_link: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn add_event_feature(&self, event_id: EventId, slug: &str) -> RegResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO event_feature (event_id, slug) VALUES (?1, ?2)",
            params![event_id, slug],
        )?;
        Ok(())
    }

    /// Features of the event merged with those of its association.
    pub fn event_features(&self, event_id: EventId) -> RegResult<FeatureSet> {
        let mut stmt = self.conn.prepare(
            "SELECT slug FROM event_feature WHERE event_id = ?1
             UNION
             SELECT af.slug FROM association_feature af
             JOIN event e ON e.assoc_id = af.assoc_id
             WHERE e.id = ?1",
        )?;
        let slugs = stmt
            .query_map(params![event_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(slugs.into_iter().collect())
    }

    pub fn set_event_config(&self, event_id: EventId, name: &str, value: &str) -> RegResult<()> {
        self.conn.execute(
            "INSERT INTO event_config (event_id, name, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(event_id, name) DO UPDATE SET value = excluded.value",
            params![event_id, name, value],
        )?;
        Ok(())
    }

    pub fn event_config_value(&self, event_id: EventId, name: &str) -> RegResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM event_config WHERE event_id = ?1 AND name = ?2",
                params![event_id, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    // ── Run ───────────────────────────────────────────────────────

    pub fn insert_run(&self, r: &RunRow) -> RegResult<RunId> {
        self.conn.execute(
            "INSERT INTO run (id, event_id, number, start_date, end_date,
                              registration_open, registration_closed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                r.id,
                r.event_id,
                r.number,
                r.start,
                r.end,
                r.registration_open,
                r.registration_closed,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_run(&self, run_id: RunId) -> RegResult<Option<RunRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, event_id, number, start_date, end_date,
                        registration_open, registration_closed
                 FROM run WHERE id = ?1",
                params![run_id],
                Self::map_run_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn runs_for_event(&self, event_id: EventId) -> RegResult<Vec<RunRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_id, number, start_date, end_date,
                    registration_open, registration_closed
             FROM run WHERE event_id = ?1 ORDER BY number ASC",
        )?;
        let rows = stmt
            .query_map(params![event_id], Self::map_run_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn set_run_registration_closed(&self, run_id: RunId, closed: bool) -> RegResult<()> {
        self.conn.execute(
            "UPDATE run SET registration_closed = ?1 WHERE id = ?2",
            params![closed, run_id],
        )?;
        Ok(())
    }

    fn map_run_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RunRow> {
        Ok(RunRow {
            id: row.get(0)?,
            event_id: row.get(1)?,
            number: row.get(2)?,
            start: row.get(3)?,
            end: row.get(4)?,
            registration_open: row.get(5)?,
            registration_closed: row.get(6)?,
        })
    }
}
