use super::{MemberRow, MembershipRow, RegStore};
use crate::{
    error::RegResult,
    types::{AssocId, EventId, MemberId, MembershipStatus},
};
use rusqlite::{params, OptionalExtension};

impl RegStore {
    // ── Member ────────────────────────────────────────────────────

    pub fn insert_member(&self, m: &MemberRow) -> RegResult<MemberId> {
        self.conn.execute(
            "INSERT INTO member (id, name, surname, email, profile_compiled)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![m.id, m.name, m.surname, m.email, m.profile_compiled],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_member(&self, member_id: MemberId) -> RegResult<Option<MemberRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, surname, email, profile_compiled FROM member WHERE id = ?1",
                params![member_id],
                |row| {
                    Ok(MemberRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        surname: row.get(2)?,
                        email: row.get(3)?,
                        profile_compiled: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn set_profile_compiled(&self, member_id: MemberId, compiled: bool) -> RegResult<()> {
        self.conn.execute(
            "UPDATE member SET profile_compiled = ?1 WHERE id = ?2",
            params![compiled, member_id],
        )?;
        Ok(())
    }

    // ── Membership ────────────────────────────────────────────────

    pub fn get_membership(
        &self,
        member_id: MemberId,
        assoc_id: AssocId,
    ) -> RegResult<Option<MembershipRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT member_id, assoc_id, status FROM membership
                 WHERE member_id = ?1 AND assoc_id = ?2",
                params![member_id, assoc_id],
                |row| {
                    Ok(MembershipRow {
                        member_id: row.get(0)?,
                        assoc_id: row.get(1)?,
                        status: MembershipStatus::parse(&row.get::<_, String>(2)?),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Membership of the member in the association, created as `Empty`
    /// on first lookup.
    pub fn get_or_create_membership(
        &self,
        member_id: MemberId,
        assoc_id: AssocId,
    ) -> RegResult<MembershipRow> {
        if let Some(existing) = self.get_membership(member_id, assoc_id)? {
            return Ok(existing);
        }
        self.conn.execute(
            "INSERT INTO membership (member_id, assoc_id, status) VALUES (?1, ?2, ?3)",
            params![member_id, assoc_id, MembershipStatus::Empty.as_str()],
        )?;
        Ok(MembershipRow {
            member_id,
            assoc_id,
            status: MembershipStatus::Empty,
        })
    }

    pub fn set_membership_status(
        &self,
        member_id: MemberId,
        assoc_id: AssocId,
        status: MembershipStatus,
    ) -> RegResult<()> {
        self.conn.execute(
            "INSERT INTO membership (member_id, assoc_id, status) VALUES (?1, ?2, ?3)
             ON CONFLICT(member_id, assoc_id) DO UPDATE SET status = excluded.status",
            params![member_id, assoc_id, status.as_str()],
        )?;
        Ok(())
    }

    // ── Membership fee ────────────────────────────────────────────

    pub fn insert_membership_fee(
        &self,
        member_id: MemberId,
        assoc_id: AssocId,
        year: i32,
        value: f64,
    ) -> RegResult<()> {
        self.conn.execute(
            "INSERT INTO membership_fee (member_id, assoc_id, year, value)
             VALUES (?1, ?2, ?3, ?4)",
            params![member_id, assoc_id, year, value],
        )?;
        Ok(())
    }

    pub fn has_paid_membership_fee(
        &self,
        member_id: MemberId,
        assoc_id: AssocId,
        year: i32,
    ) -> RegResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM membership_fee
             WHERE member_id = ?1 AND assoc_id = ?2 AND year = ?3",
            params![member_id, assoc_id, year],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ── Pre-registration ──────────────────────────────────────────

    pub fn insert_pre_registration(
        &self,
        member_id: MemberId,
        event_id: EventId,
        pref: i64,
    ) -> RegResult<()> {
        self.conn.execute(
            "INSERT INTO pre_registration (member_id, event_id, pref) VALUES (?1, ?2, ?3)",
            params![member_id, event_id, pref],
        )?;
        Ok(())
    }

    pub fn has_pre_registration(&self, member_id: MemberId, event_id: EventId) -> RegResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pre_registration
             WHERE member_id = ?1 AND event_id = ?2 AND deleted = 0",
            params![member_id, event_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
