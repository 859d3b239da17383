//! Member-specific lookups, counters and orphan sweeps.

use super::mapping::{select_list, SqlRecord};
use super::{query_scalar, SqliteMemberStore};
use crate::model::{BalanceInfo, FavoriteKind, GrowAccount, InvitationMember, Member, MemberId};
use crate::store::{CleanupStep, MemberStore, StoreResult};
use rusqlite::{params, params_from_iter};
use std::collections::BTreeMap;

impl CleanupStep {
    fn table(self) -> &'static str {
        match self {
            Self::Profile => "mm_profile",
            Self::BankInfo => "mm_bank",
            Self::Account => "mm_account",
            Self::Relation => "mm_relation",
            Self::TrustedInfo => "mm_trusted_info",
            Self::Addresses => "mm_deliver_addr",
            Self::Favorites => "mm_favorite",
            Self::IntegralLogs => "mm_integral_log",
            Self::LevelUpLogs => "mm_levelup",
            Self::BalanceLogs => "mm_balance_log",
            Self::WalletLogs => "mm_wallet_log",
            Self::BalanceInfos => "mm_balance_info",
        }
    }
}

impl SqliteMemberStore {
    fn member_id_where(&self, sql: &str, value: &str) -> StoreResult<Option<MemberId>> {
        if value.is_empty() {
            return Ok(None);
        }
        let conn = self.conn()?;
        query_scalar::<MemberId>(&conn, sql, [value])
    }
}

impl MemberStore for SqliteMemberStore {
    fn member_by_usr(&self, usr: &str) -> StoreResult<Option<Member>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM mm_member WHERE usr = ?1 LIMIT 1;",
            select_list::<Member>()
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([usr])?;
        match rows.next()? {
            Some(row) => Ok(Some(Member::from_row(row)?)),
            None => Ok(None),
        }
    }

    fn member_id_by_usr(&self, usr: &str) -> StoreResult<Option<MemberId>> {
        self.member_id_where("SELECT id FROM mm_member WHERE usr = ?1 LIMIT 1;", usr)
    }

    fn member_id_by_phone(&self, phone: &str) -> StoreResult<Option<MemberId>> {
        self.member_id_where(
            "SELECT member_id FROM mm_profile WHERE phone = ?1 ORDER BY member_id LIMIT 1;",
            phone,
        )
    }

    fn member_id_by_email(&self, email: &str) -> StoreResult<Option<MemberId>> {
        self.member_id_where(
            "SELECT member_id FROM mm_profile WHERE email = ?1 ORDER BY member_id LIMIT 1;",
            email,
        )
    }

    fn member_id_by_invitation_code(&self, code: &str) -> StoreResult<Option<MemberId>> {
        self.member_id_where(
            "SELECT id FROM mm_member WHERE invitation_code = ?1 LIMIT 1;",
            code,
        )
    }

    fn usr_taken(&self, usr: &str, exclude: MemberId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let count = query_scalar::<i64>(
            &conn,
            "SELECT COUNT(1) FROM mm_member WHERE usr = ?1 AND id <> ?2;",
            params![usr, exclude],
        )?;
        Ok(count.unwrap_or(0) > 0)
    }

    fn phone_bound(&self, phone: &str, exclude: MemberId) -> StoreResult<bool> {
        if phone.is_empty() {
            return Ok(false);
        }
        let conn = self.conn()?;
        let count = query_scalar::<i64>(
            &conn,
            "SELECT COUNT(1) FROM mm_profile WHERE phone = ?1 AND member_id <> ?2;",
            params![phone, exclude],
        )?;
        Ok(count.unwrap_or(0) > 0)
    }

    fn member_update_time(&self, member_id: MemberId) -> StoreResult<Option<i64>> {
        let conn = self.conn()?;
        query_scalar::<i64>(
            &conn,
            "SELECT update_time FROM mm_member WHERE id = ?1;",
            [member_id],
        )
    }

    fn count_members(&self) -> StoreResult<i64> {
        let conn = self.conn()?;
        Ok(query_scalar::<i64>(&conn, "SELECT COUNT(1) FROM mm_member;", [])?.unwrap_or(0))
    }

    fn count_members_by_level(&self, level: i32) -> StoreResult<i64> {
        let conn = self.conn()?;
        Ok(query_scalar::<i64>(
            &conn,
            "SELECT COUNT(1) FROM mm_member WHERE level = ?1;",
            [level],
        )?
        .unwrap_or(0))
    }

    fn level_value_by_exp(&self, exp: i64) -> StoreResult<Option<i32>> {
        let conn = self.conn()?;
        query_scalar::<i32>(
            &conn,
            "SELECT id FROM mm_level
             WHERE enabled = 1 AND require_exp <= ?1
             ORDER BY require_exp DESC, id DESC
             LIMIT 1;",
            [exp],
        )
    }

    fn update_grow_account(
        &self,
        member_id: MemberId,
        grow: &GrowAccount,
        update_time: i64,
    ) -> StoreResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute(
            "UPDATE mm_account
             SET grow_balance = ?1, grow_amount = ?2, grow_earnings = ?3,
                 grow_total_earnings = ?4, update_time = ?5
             WHERE member_id = ?6;",
            params![
                grow.balance,
                grow.amount,
                grow.earnings,
                grow.total_earnings,
                update_time,
                member_id
            ],
        )?)
    }

    fn delete_address(&self, member_id: MemberId, address_id: i64) -> StoreResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute(
            "DELETE FROM mm_deliver_addr WHERE id = ?1 AND member_id = ?2;",
            params![address_id, member_id],
        )?)
    }

    fn set_default_address(&self, member_id: MemberId, address_id: i64) -> StoreResult<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let owned = tx
            .query_row(
                "SELECT COUNT(1) FROM mm_deliver_addr WHERE id = ?1 AND member_id = ?2;",
                params![address_id, member_id],
                |row| row.get::<_, i64>(0),
            )?
            > 0;
        if !owned {
            return Ok(false);
        }
        tx.execute(
            "UPDATE mm_deliver_addr SET is_default = 0
             WHERE member_id = ?1 AND is_default = 1 AND id <> ?2;",
            params![member_id, address_id],
        )?;
        tx.execute(
            "UPDATE mm_deliver_addr SET is_default = 1 WHERE id = ?1;",
            [address_id],
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn favorite_exists(
        &self,
        member_id: MemberId,
        kind: FavoriteKind,
        refer_id: i64,
    ) -> StoreResult<bool> {
        let conn = self.conn()?;
        let count = query_scalar::<i64>(
            &conn,
            "SELECT COUNT(1) FROM mm_favorite
             WHERE member_id = ?1 AND fav_type = ?2 AND refer_id = ?3;",
            params![member_id, kind.to_db(), refer_id],
        )?;
        Ok(count.unwrap_or(0) > 0)
    }

    fn delete_favorite(
        &self,
        member_id: MemberId,
        kind: FavoriteKind,
        refer_id: i64,
    ) -> StoreResult<usize> {
        let conn = self.conn()?;
        Ok(conn.execute(
            "DELETE FROM mm_favorite WHERE member_id = ?1 AND fav_type = ?2 AND refer_id = ?3;",
            params![member_id, kind.to_db(), refer_id],
        )?)
    }

    fn invitees(
        &self,
        inviter_id: MemberId,
        offset: u32,
        limit: u32,
    ) -> StoreResult<(i64, Vec<InvitationMember>)> {
        let conn = self.conn()?;
        let total = query_scalar::<i64>(
            &conn,
            "SELECT COUNT(1) FROM mm_relation r
             INNER JOIN mm_member m ON m.id = r.member_id
             WHERE r.inviter_id = ?1;",
            [inviter_id],
        )?
        .unwrap_or(0);
        if total == 0 {
            return Ok((0, Vec::new()));
        }

        let mut stmt = conn.prepare(
            "SELECT m.id, m.usr, m.level,
                    COALESCE(p.avatar, ''), COALESCE(p.name, ''),
                    COALESCE(p.phone, ''), COALESCE(p.im, '')
             FROM mm_relation r
             INNER JOIN mm_member m ON m.id = r.member_id
             LEFT JOIN mm_profile p ON p.member_id = m.id
             WHERE r.inviter_id = ?1
             ORDER BY m.level DESC, m.id ASC
             LIMIT ?2 OFFSET ?3;",
        )?;
        let rows = stmt.query_map(
            params![inviter_id, i64::from(limit), i64::from(offset)],
            |row| {
                Ok(InvitationMember {
                    member_id: row.get(0)?,
                    usr: row.get(1)?,
                    level: row.get(2)?,
                    avatar: row.get(3)?,
                    name: row.get(4)?,
                    phone: row.get(5)?,
                    im: row.get(6)?,
                })
            },
        )?;
        let page = rows.collect::<Result<Vec<_>, _>>()?;
        Ok((total, page))
    }

    fn sub_invitation_counts(
        &self,
        member_ids: &[MemberId],
    ) -> StoreResult<BTreeMap<MemberId, i64>> {
        let mut counts: BTreeMap<MemberId, i64> =
            member_ids.iter().map(|id| (*id, 0)).collect();
        if member_ids.is_empty() {
            return Ok(counts);
        }

        let placeholders = vec!["?"; member_ids.len()].join(", ");
        let sql = format!(
            "SELECT inviter_id, COUNT(1) FROM mm_relation
             WHERE inviter_id IN ({placeholders})
             GROUP BY inviter_id;"
        );
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(member_ids.iter()), |row| {
            Ok((row.get::<_, MemberId>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (inviter_id, count) = row?;
            counts.insert(inviter_id, count);
        }
        Ok(counts)
    }

    fn inviter_of(&self, member_id: MemberId) -> StoreResult<Option<Member>> {
        let conn = self.conn()?;
        let columns = select_list::<Member>()
            .split(", ")
            .map(|column| format!("m.{column}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {columns} FROM mm_member m
             INNER JOIN mm_relation r ON r.inviter_id = m.id
             WHERE r.member_id = ?1 AND r.inviter_id > 0
             LIMIT 1;"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([member_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(Member::from_row(row)?)),
            None => Ok(None),
        }
    }

    fn balance_info_by_trade_no(&self, trade_no: &str) -> StoreResult<Option<BalanceInfo>> {
        if trade_no.is_empty() {
            return Ok(None);
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM mm_balance_info WHERE trade_no = ?1 LIMIT 1;",
            select_list::<BalanceInfo>()
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([trade_no])?;
        match rows.next()? {
            Some(row) => Ok(Some(BalanceInfo::from_row(row)?)),
            None => Ok(None),
        }
    }

    fn cleanup_orphans(&self, step: CleanupStep) -> StoreResult<usize> {
        let conn = self.conn()?;
        let sql = format!(
            "DELETE FROM {} WHERE member_id > 0
             AND member_id NOT IN (SELECT id FROM mm_member);",
            step.table()
        );
        Ok(conn.execute(&sql, [])?)
    }
}
