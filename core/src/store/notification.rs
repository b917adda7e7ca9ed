use super::{NotificationRow, RegStore};
use crate::{error::RegResult, types::AssocId};
use rusqlite::params;

impl RegStore {
    // ── Notification queue ────────────────────────────────────────

    pub fn insert_notification(&self, n: &NotificationRow) -> RegResult<i64> {
        self.conn.execute(
            "INSERT INTO notification_queue (assoc_id, recipient, subject, body, digest, created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![n.assoc_id, n.recipient, n.subject, n.body, n.digest, n.created],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn notifications_for_association(
        &self,
        assoc_id: AssocId,
    ) -> RegResult<Vec<NotificationRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, assoc_id, recipient, subject, body, digest, created
             FROM notification_queue WHERE assoc_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![assoc_id], |row| {
                Ok(NotificationRow {
                    id: row.get(0)?,
                    assoc_id: row.get(1)?,
                    recipient: row.get(2)?,
                    subject: row.get(3)?,
                    body: row.get(4)?,
                    digest: row.get(5)?,
                    created: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
