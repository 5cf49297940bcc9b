use crate::tests::temp_db;
use crate::{def_table, Database, DbResult};

def_table!(test_index: (u8, u64) => ());

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn paginate_partition_rev() -> DbResult<()> {
    let (_dir, db) = temp_db().await?;

    db.write_with(|tx| {
        let mut table = tx.open_table(&test_index::TABLE)?;

        for n in [1u64, 2, 3, 4, 5, 6] {
            table.insert(&(7u8, n), &())?;
        }
        // Neighboring partitions must not leak in.
        table.insert(&(6u8, 100), &())?;
        table.insert(&(8u8, 0), &())?;

        let all = |k: &(u8, u64)| {
            let _ = k;
            Ok(true)
        };

        // Full partition, newest first.
        assert_eq!(
            Database::paginate_partition_rev(
                &table,
                (7u8, u64::MIN)..=(7u8, u64::MAX),
                0,
                10,
                all,
                |(_, n)| Ok(Some(n)),
            )?,
            (vec![6, 5, 4, 3, 2, 1], 6)
        );

        // Windows move, the total does not.
        assert_eq!(
            Database::paginate_partition_rev(
                &table,
                (7u8, u64::MIN)..=(7u8, u64::MAX),
                0,
                2,
                all,
                |(_, n)| Ok(Some(n)),
            )?,
            (vec![6, 5], 6)
        );
        assert_eq!(
            Database::paginate_partition_rev(
                &table,
                (7u8, u64::MIN)..=(7u8, u64::MAX),
                4,
                2,
                all,
                |(_, n)| Ok(Some(n)),
            )?,
            (vec![2, 1], 6)
        );
        assert_eq!(
            Database::paginate_partition_rev(
                &table,
                (7u8, u64::MIN)..=(7u8, u64::MAX),
                6,
                2,
                all,
                |(_, n)| Ok(Some(n)),
            )?,
            (vec![], 6)
        );

        // Predicate applies to the count, not just the window.
        assert_eq!(
            Database::paginate_partition_rev(
                &table,
                (7u8, u64::MIN)..=(7u8, u64::MAX),
                1,
                2,
                |&(_, n)| Ok(n % 2 == 0),
                |(_, n)| Ok(Some(n)),
            )?,
            (vec![4, 2], 3)
        );

        // A key the mapper cannot resolve shrinks the page, not the total.
        assert_eq!(
            Database::paginate_partition_rev(
                &table,
                (7u8, u64::MIN)..=(7u8, u64::MAX),
                0,
                3,
                all,
                |(_, n)| Ok((n != 5).then_some(n)),
            )?,
            (vec![6, 4], 6)
        );

        Ok(())
    })
    .await?;

    Ok(())
}
