use super::{RegStore, RegistrationRow, TicketRow};
use crate::{
    error::RegResult,
    types::{
        AssocId, EventId, MemberId, RegistrationId, RegistrationState, RunId, TicketId, TicketTier,
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};

const REGISTRATION_COLUMNS: &str = "id, member_id, run_id, ticket_id, additionals, pay_what,
    surcharge, tot_iscr, tot_payed, quota, deadline, alert, redeem_code, created,
    cancellation_date";

/// Active registrations of one tier bucket. `tier` is `None` for
/// registrations without a (live) ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct TierCount {
    pub tier: Option<TicketTier>,
    pub count: i64,
}

/// One row of the association leaderboard query.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRow {
    pub member_id: MemberId,
    pub name: String,
    pub surname: String,
    pub runs: i64,
}

impl RegStore {
    // ── Ticket ────────────────────────────────────────────────────

    pub fn insert_ticket(&self, t: &TicketRow) -> RegResult<TicketId> {
        self.conn.execute(
            "INSERT INTO ticket (id, event_id, tier, name, price) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![t.id, t.event_id, t.tier.as_str(), t.name, t.price],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn soft_delete_ticket(&self, ticket_id: TicketId) -> RegResult<()> {
        self.conn.execute(
            "UPDATE ticket SET deleted = 1 WHERE id = ?1",
            params![ticket_id],
        )?;
        Ok(())
    }

    /// Live ticket by id. Soft-deleted tickets read as absent.
    pub fn get_ticket(&self, ticket_id: TicketId) -> RegResult<Option<TicketRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, event_id, tier, name, price FROM ticket
                 WHERE id = ?1 AND deleted = 0",
                params![ticket_id],
                Self::map_ticket_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Live tickets of an event, most expensive first.
    pub fn tickets_for_event(&self, event_id: EventId) -> RegResult<Vec<TicketRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_id, tier, name, price FROM ticket
             WHERE event_id = ?1 AND deleted = 0
             ORDER BY price DESC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![event_id], Self::map_ticket_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_ticket_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TicketRow> {
        let tier: String = row.get(2)?;
        Ok(TicketRow {
            id: row.get(0)?,
            event_id: row.get(1)?,
            tier: TicketTier::parse(&tier).unwrap_or(TicketTier::Standard),
            name: row.get(3)?,
            price: row.get(4)?,
        })
    }

    // ── Registration ──────────────────────────────────────────────

    pub fn insert_registration(&self, r: &RegistrationRow) -> RegResult<RegistrationId> {
        self.conn.execute(
            "INSERT INTO registration (member_id, run_id, ticket_id, additionals, pay_what,
                surcharge, tot_iscr, tot_payed, quota, deadline, alert, redeem_code, created,
                cancellation_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                r.member_id,
                r.run_id,
                r.ticket_id,
                r.additionals,
                r.pay_what,
                r.surcharge,
                r.tot_iscr,
                r.tot_payed,
                r.quota,
                r.deadline,
                r.alert,
                r.redeem_code,
                r.created,
                r.state.cancelled_at(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_registration(&self, reg_id: RegistrationId) -> RegResult<Option<RegistrationRow>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {REGISTRATION_COLUMNS} FROM registration WHERE id = ?1"),
                params![reg_id],
                Self::map_registration_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn active_registrations_for_run(&self, run_id: RunId) -> RegResult<Vec<RegistrationRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registration
             WHERE run_id = ?1 AND cancellation_date IS NULL
             ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params![run_id], Self::map_registration_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn active_registrations_for_member(
        &self,
        run_id: RunId,
        member_id: MemberId,
    ) -> RegResult<Vec<RegistrationRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registration
             WHERE run_id = ?1 AND member_id = ?2 AND cancellation_date IS NULL
             ORDER BY id ASC"
        ))?;
        let rows = stmt
            .query_map(params![run_id, member_id], Self::map_registration_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Ids of every registration row still present in the run, cancelled
    /// ones included.
    pub fn registration_ids_for_run(&self, run_id: RunId) -> RegResult<Vec<RegistrationId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM registration WHERE run_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![run_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Ids of every registration (active or not) of a member in a run.
    pub fn registration_ids_for_member(
        &self,
        run_id: RunId,
        member_id: MemberId,
    ) -> RegResult<Vec<RegistrationId>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM registration WHERE run_id = ?1 AND member_id = ?2 ORDER BY id",
        )?;
        let ids = stmt
            .query_map(params![run_id, member_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Whether the member holds an active registration in the run other
    /// than `exclude`.
    pub fn has_other_active_registration(
        &self,
        member_id: MemberId,
        run_id: RunId,
        exclude: Option<RegistrationId>,
    ) -> RegResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM registration
             WHERE member_id = ?1 AND run_id = ?2 AND cancellation_date IS NULL
               AND id != COALESCE(?3, -1)",
            params![member_id, run_id, exclude],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn cancel_registration(&self, reg_id: RegistrationId, at: DateTime<Utc>) -> RegResult<()> {
        self.conn.execute(
            "UPDATE registration SET cancellation_date = ?1 WHERE id = ?2",
            params![at, reg_id],
        )?;
        Ok(())
    }

    /// Overwrite the money columns of a registration.
    pub fn update_registration_totals(
        &self,
        reg_id: RegistrationId,
        tot_iscr: f64,
        tot_payed: f64,
        quota: f64,
        deadline: i64,
        alert: bool,
    ) -> RegResult<()> {
        self.conn.execute(
            "UPDATE registration
             SET tot_iscr = ?1, tot_payed = ?2, quota = ?3, deadline = ?4, alert = ?5
             WHERE id = ?6",
            params![tot_iscr, tot_payed, quota, deadline, alert, reg_id],
        )?;
        Ok(())
    }

    pub fn delete_registration(&self, reg_id: RegistrationId) -> RegResult<()> {
        self.conn
            .execute("DELETE FROM registration WHERE id = ?1", params![reg_id])?;
        Ok(())
    }

    /// Active registrations of a run grouped by ticket tier, each counting
    /// itself plus its additional seats.
    pub fn registration_tier_counts(&self, run_id: RunId) -> RegResult<Vec<TierCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.tier, SUM(1 + r.additionals)
             FROM registration r
             LEFT JOIN ticket t ON t.id = r.ticket_id AND t.deleted = 0
             WHERE r.run_id = ?1 AND r.cancellation_date IS NULL
             GROUP BY t.tier",
        )?;
        let rows = stmt
            .query_map(params![run_id], |row| {
                let tier: Option<String> = row.get(0)?;
                Ok(TierCount {
                    tier: tier.as_deref().and_then(TicketTier::parse),
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Members ranked by active registrations to association runs that
    /// ended before `before`.
    pub fn attendance_ranking(
        &self,
        assoc_id: AssocId,
        before: NaiveDate,
        limit: usize,
    ) -> RegResult<Vec<AttendanceRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.name, m.surname, COUNT(r.id) AS runs
             FROM registration r
             JOIN run ru ON ru.id = r.run_id
             JOIN event e ON e.id = ru.event_id
             JOIN member m ON m.id = r.member_id
             WHERE e.assoc_id = ?1
               AND r.cancellation_date IS NULL
               AND ru.end_date IS NOT NULL AND ru.end_date < ?2
             GROUP BY m.id, m.name, m.surname
             ORDER BY runs DESC, m.name ASC, m.surname ASC, m.id ASC
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![assoc_id, before, limit as i64], |row| {
                Ok(AttendanceRow {
                    member_id: row.get(0)?,
                    name: row.get(1)?,
                    surname: row.get(2)?,
                    runs: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn map_registration_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RegistrationRow> {
        Ok(RegistrationRow {
            id: row.get(0)?,
            member_id: row.get(1)?,
            run_id: row.get(2)?,
            ticket_id: row.get(3)?,
            additionals: row.get(4)?,
            pay_what: row.get(5)?,
            surcharge: row.get(6)?,
            tot_iscr: row.get(7)?,
            tot_payed: row.get(8)?,
            quota: row.get(9)?,
            deadline: row.get(10)?,
            alert: row.get(11)?,
            redeem_code: row.get(12)?,
            created: row.get(13)?,
            state: RegistrationState::from_cancellation(row.get(14)?),
        })
    }
}
