use super::{InvoiceRow, OtherItemRow, PaymentKindTotal, PaymentRow, RegStore};
use crate::{
    error::RegResult,
    types::{
        InvoiceId, InvoiceStatus, MemberId, OtherKind, PaymentKind, RegistrationId, RunId,
        INVOICE_TYPE_REGISTRATION,
    },
};
use rusqlite::{params, OptionalExtension};

impl RegStore {
    // ── Payments ──────────────────────────────────────────────────

    pub fn insert_payment(&self, p: &PaymentRow) -> RegResult<i64> {
        self.conn.execute(
            "INSERT INTO accounting_item_payment
             (member_id, reg_id, assoc_id, pay, value, hide, inv_id, created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                p.member_id,
                p.reg_id,
                p.assoc_id,
                p.pay.as_str(),
                p.value,
                p.hide,
                p.inv_id,
                p.created,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn payments_for_registration(&self, reg_id: RegistrationId) -> RegResult<Vec<PaymentRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, member_id, reg_id, assoc_id, pay, value, hide, inv_id, created
             FROM accounting_item_payment WHERE reg_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![reg_id], |row| {
                Ok(PaymentRow {
                    id: row.get(0)?,
                    member_id: row.get(1)?,
                    reg_id: row.get(2)?,
                    assoc_id: row.get(3)?,
                    pay: PaymentKind::parse(&row.get::<_, String>(4)?),
                    value: row.get(5)?,
                    hide: row.get(6)?,
                    inv_id: row.get(7)?,
                    created: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_payments_for_registration(&self, reg_id: RegistrationId) -> RegResult<usize> {
        let n = self.conn.execute(
            "DELETE FROM accounting_item_payment WHERE reg_id = ?1",
            params![reg_id],
        )?;
        Ok(n)
    }

    /// Non-hidden token and credit payment sums per member for a run.
    /// With `member_id` set, only that member's sums are returned.
    pub fn special_payment_totals(
        &self,
        run_id: RunId,
        member_id: Option<MemberId>,
    ) -> RegResult<Vec<PaymentKindTotal>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.member_id, p.pay, SUM(p.value)
             FROM accounting_item_payment p
             JOIN registration r ON r.id = p.reg_id
             WHERE r.run_id = ?1
               AND (?2 IS NULL OR p.member_id = ?2)
               AND p.hide = 0
               AND p.pay IN ('token', 'credit')
             GROUP BY p.member_id, p.pay
             ORDER BY p.member_id ASC, p.pay ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, member_id], |row| {
                Ok(PaymentKindTotal {
                    member_id: row.get(0)?,
                    pay: PaymentKind::parse(&row.get::<_, String>(1)?),
                    total: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ── Other accounting items ────────────────────────────────────

    pub fn insert_other_item(&self, o: &OtherItemRow) -> RegResult<i64> {
        self.conn.execute(
            "INSERT INTO accounting_item_other
             (member_id, run_id, assoc_id, oth, value, cancellation, descr)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                o.member_id,
                o.run_id,
                o.assoc_id,
                o.oth.as_str(),
                o.value,
                o.cancellation,
                o.descr,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn other_items_for_member(
        &self,
        run_id: RunId,
        member_id: MemberId,
    ) -> RegResult<Vec<OtherItemRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, member_id, run_id, assoc_id, oth, value, cancellation, descr
             FROM accounting_item_other
             WHERE run_id = ?1 AND member_id = ?2 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id, member_id], |row| {
                Ok(OtherItemRow {
                    id: row.get(0)?,
                    member_id: row.get(1)?,
                    run_id: row.get(2)?,
                    assoc_id: row.get(3)?,
                    oth: OtherKind::parse(&row.get::<_, String>(4)?),
                    value: row.get(5)?,
                    cancellation: row.get(6)?,
                    descr: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_other_item(&self, item_id: i64) -> RegResult<()> {
        self.conn.execute(
            "DELETE FROM accounting_item_other WHERE id = ?1",
            params![item_id],
        )?;
        Ok(())
    }

    // ── Invoices ──────────────────────────────────────────────────

    pub fn insert_invoice(&self, i: &InvoiceRow) -> RegResult<InvoiceId> {
        self.conn.execute(
            "INSERT INTO payment_invoice
             (member_id, assoc_id, method, typ, status, gross, trans, cod, idx, causal, created)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                i.member_id,
                i.assoc_id,
                i.method,
                i.typ,
                i.status.as_str(),
                i.gross,
                i.trans,
                i.cod,
                i.idx,
                i.causal,
                i.created,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_invoice(&self, invoice_id: InvoiceId) -> RegResult<Option<InvoiceRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, member_id, assoc_id, method, typ, status, gross, trans, cod, idx,
                        causal, created
                 FROM payment_invoice WHERE id = ?1",
                params![invoice_id],
                Self::map_invoice_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Registration-type invoices attached to a registration.
    pub fn invoices_for_registration(&self, reg_id: RegistrationId) -> RegResult<Vec<InvoiceRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, member_id, assoc_id, method, typ, status, gross, trans, cod, idx,
                    causal, created
             FROM payment_invoice WHERE typ = ?1 AND idx = ?2 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![INVOICE_TYPE_REGISTRATION, reg_id], Self::map_invoice_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_invoice(&self, invoice_id: InvoiceId) -> RegResult<()> {
        self.conn.execute(
            "DELETE FROM payment_invoice WHERE id = ?1",
            params![invoice_id],
        )?;
        Ok(())
    }

    fn map_invoice_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<InvoiceRow> {
        Ok(InvoiceRow {
            id: row.get(0)?,
            member_id: row.get(1)?,
            assoc_id: row.get(2)?,
            method: row.get(3)?,
            typ: row.get(4)?,
            status: InvoiceStatus::parse(&row.get::<_, String>(5)?),
            gross: row.get(6)?,
            trans: row.get(7)?,
            cod: row.get(8)?,
            idx: row.get(9)?,
            causal: row.get(10)?,
            created: row.get(11)?,
        })
    }
}
