// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The list of carvers attached to a root.  The root owns them; callers
//! hold an `AttachedId` and get the carver back on detach.

use crate::carver::Carver;
use crate::error::Result;

/// Handle to a carver attached to a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachedId(pub(crate) usize);

impl AttachedId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Default)]
pub(crate) struct CarverList {
    next: usize,
    entries: Vec<(AttachedId, Carver)>,
}

impl CarverList {
    pub fn push(&mut self, carver: Carver) -> AttachedId {
        let id = AttachedId(self.next);
        self.next += 1;
        self.entries.push((id, carver));
        id
    }

    pub fn remove(&mut self, id: AttachedId) -> Option<Carver> {
        let pos = self.entries.iter().position(|(i, _)| *i == id)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, id: AttachedId) -> Option<&Carver> {
        self.entries.iter().find(|(i, _)| *i == id).map(|(_, c)| c)
    }

    pub fn get_mut(&mut self, id: AttachedId) -> Option<&mut Carver> {
        self.entries.iter_mut().find(|(i, _)| *i == id).map(|(_, c)| c)
    }

    pub fn ids(&self) -> Vec<AttachedId> {
        self.entries.iter().map(|(i, _)| *i).collect()
    }

    /// Visit every attached carver, and theirs, depth first, in
    /// attachment order.  Stops at the first error.
    pub fn try_for_each<F>(&mut self, f: &mut F) -> Result<()>
    where
        F: FnMut(&mut Carver) -> Result<()>,
    {
        for (_, carver) in self.entries.iter_mut() {
            f(carver)?;
            carver.attached.try_for_each(f)?;
        }
        Ok(())
    }

    pub fn for_each<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Carver),
    {
        for (_, carver) in self.entries.iter_mut() {
            f(carver);
            carver.attached.for_each(f);
        }
    }
}
