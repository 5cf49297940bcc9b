use std::ops;

use crate::{Database, DbResult};

impl Database {
    /// Walk an ordering-table partition newest-first, counting every key the
    /// predicate keeps and materializing only the `skip`/`limit` window.
    ///
    /// The returned total is the count of kept keys over the whole partition,
    /// so it does not depend on the window. A window entry the mapper cannot
    /// resolve is skipped rather than failing the page.
    pub fn paginate_partition_rev<K, R>(
        table: &impl redb_bincode::ReadableTable<K, ()>,
        prefix: ops::RangeInclusive<K>,
        skip: u64,
        limit: usize,
        mut keep_fn: impl FnMut(&K) -> DbResult<bool>,
        mut map_fn: impl FnMut(K) -> DbResult<Option<R>>,
    ) -> DbResult<(Vec<R>, u64)>
    where
        K: bincode::Encode + bincode::Decode<()>,
    {
        let (prefix_start, prefix_end) = prefix.into_inner();

        let mut ret = vec![];
        let mut total = 0u64;

        for entry in table.range(&prefix_start..=&prefix_end)?.rev() {
            let (k, _) = entry?;

            let k = k.value();
            if !keep_fn(&k)? {
                continue;
            }

            total += 1;

            if skip < total && ret.len() < limit {
                if let Some(r) = map_fn(k)? {
                    ret.push(r);
                }
            }
        }

        Ok((ret, total))
    }
}

#[cfg(test)]
mod tests;
