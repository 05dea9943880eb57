//! The texture resource registry: handle-indexed lifecycle records for
//! every device-resident image, per-unit bind accounting, and memory
//! accounting aggregated under named groups.

use smallvec::SmallVec;

use crate::device::{Device, DeviceTextureId};
use crate::errors::{Error, Result};
use crate::state::SamplerParams;
use crate::utils::hash::{FastHashMap, HashValue};
use crate::utils::object_pool::ObjectPool;

impl_handle!(TextureHandle);

/// Number of well-known standard texture slots (white, black, grey,
/// normalization map and friends).
pub const MAX_STD_TEXTURES: usize = 8;

/// Well-known engine textures, cross-referenced by slot so that shaders
/// can fall back to them without going through a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdTexture {
    White,
    Black,
    Grey,
    FlatNormal,
}

impl StdTexture {
    #[inline]
    fn slot(self) -> usize {
        match self {
            StdTexture::White => 0,
            StdTexture::Black => 1,
            StdTexture::Grey => 2,
            StdTexture::FlatNormal => 3,
        }
    }
}

/// Pixel formats the registry can account for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    U8,
    U8U8,
    U8U8U8U8,
    F16F16F16F16,
    F32,
    Depth16,
    Depth24Stencil8,
}

impl TextureFormat {
    /// Returns the size in bytes of a single pixel.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::U8 => 1,
            TextureFormat::U8U8 | TextureFormat::Depth16 => 2,
            TextureFormat::U8U8U8U8 | TextureFormat::F32 | TextureFormat::Depth24Stencil8 => 4,
            TextureFormat::F16F16F16F16 => 8,
        }
    }

    pub fn is_depth(self) -> bool {
        match self {
            TextureFormat::Depth16 | TextureFormat::Depth24Stencil8 => true,
            _ => false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TextureFlags {
    /// The resource will be updated by the CPU frequently.
    pub dynamic: bool,
    /// The resource can be bound as a render target.
    pub render_target: bool,
}

/// Creation-time description of a texture resource.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub depth: u16,
    pub format: TextureFormat,
    pub mip_levels: u8,
    pub flags: TextureFlags,
    pub debug_name: String,
}

impl Default for TextureDesc {
    fn default() -> Self {
        TextureDesc {
            width: 0,
            height: 0,
            depth: 1,
            format: TextureFormat::U8U8U8U8,
            mip_levels: 1,
            flags: TextureFlags::default(),
            debug_name: String::new(),
        }
    }
}

impl TextureDesc {
    /// Computed memory footprint of the full mip chain, per copy.
    pub fn memory_bytes(&self) -> u64 {
        let bpp = u64::from(self.format.bytes_per_pixel());
        let mut total = 0u64;
        let (mut w, mut h) = (u64::from(self.width), u64::from(self.height));

        for _ in 0..self.mip_levels.max(1) {
            total += w * h * u64::from(self.depth) * bpp;
            w = (w / 2).max(1);
            h = (h / 2).max(1);
        }

        total
    }
}

/// The device resources behind a logical texture handle. The active
/// representation is statically known, so a depth surface can never be
/// mistaken for a round-robin copy array.
#[derive(Debug)]
pub enum TextureStorage {
    /// Handle reserved, no device resources allocated yet.
    Vacant,
    Simple(DeviceTextureId),
    /// Round-robin copies for procedural textures rewritten every frame;
    /// `cursor` is the copy that subsequent binds will see.
    MultiCopy {
        copies: SmallVec<[DeviceTextureId; 4]>,
        cursor: usize,
    },
    DepthSurface(DeviceTextureId),
}

impl TextureStorage {
    /// The device resource a bind of this handle resolves to, if any.
    pub fn active(&self) -> Option<DeviceTextureId> {
        match *self {
            TextureStorage::Vacant => None,
            TextureStorage::Simple(id) => Some(id),
            TextureStorage::MultiCopy { ref copies, cursor } => Some(copies[cursor]),
            TextureStorage::DepthSurface(id) => Some(id),
        }
    }

    /// Advances the round-robin cursor, wrapping to 0 after the last copy.
    /// No-op for single-resource storage.
    pub fn advance(&mut self) {
        if let TextureStorage::MultiCopy { ref copies, ref mut cursor } = *self {
            *cursor = (*cursor + 1) % copies.len();
        }
    }

    pub fn is_multi_copy(&self) -> bool {
        match *self {
            TextureStorage::MultiCopy { .. } => true,
            _ => false,
        }
    }
}

/// The lifecycle record of one allocated texture handle.
#[derive(Debug)]
pub struct TextureRecord {
    pub desc: TextureDesc,
    pub storage: TextureStorage,
    pub sampler: SamplerParams,
    /// How many times this texture was bound since the last frame advance.
    pub times_bound_frame: u32,
    pub max_times_bound: u32,
    group: HashValue<str>,
    /// Total footprint across all copies.
    bytes: u64,
}

/// Aggregated memory counters for one named accounting group.
#[derive(Debug, Default, Clone, Copy)]
pub struct GroupStats {
    /// Bytes of all live textures registered under the group.
    pub global_bytes: u64,
    /// Bytes of group textures bound at least once this frame.
    pub frame_bytes: u64,
}

struct TextureGroup {
    name: String,
    stats: GroupStats,
}

/// A sparse, handle-indexed table of texture records. A record exists
/// exactly while its handle is alive; freed handles go back on the free
/// list and can be reissued with a bumped version.
pub struct TextureRegistry {
    records: ObjectPool<TextureHandle, TextureRecord>,
    groups: FastHashMap<HashValue<str>, TextureGroup>,
    std_slots: [Option<TextureHandle>; MAX_STD_TEXTURES],
    modify_cursor: Option<TextureHandle>,
    /// Per-frame bound-texture budget; binds that would exceed it degrade
    /// to "no texture" instead of failing the draw.
    frame_budget: Option<u64>,
}

impl Default for TextureRegistry {
    fn default() -> Self {
        TextureRegistry::new(None)
    }
}

impl TextureRegistry {
    pub fn new(frame_budget: Option<u64>) -> Self {
        TextureRegistry {
            records: ObjectPool::new(),
            groups: FastHashMap::default(),
            std_slots: [None; MAX_STD_TEXTURES],
            modify_cursor: None,
            frame_budget,
        }
    }

    #[inline]
    pub fn contains(&self, handle: TextureHandle) -> bool {
        self.records.contains(handle)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&TextureRecord> {
        self.records.get(handle)
    }

    /// Reserves a handle with no device resources behind it yet.
    pub fn create_handle(&mut self) -> TextureHandle {
        self.records.create(TextureRecord {
            desc: TextureDesc::default(),
            storage: TextureStorage::Vacant,
            sampler: SamplerParams::default(),
            times_bound_frame: 0,
            max_times_bound: 0,
            group: "".into(),
            bytes: 0,
        })
    }

    /// Ensures `out` holds exactly `count` live handles. With
    /// `reuse_existing`, handles in `out` that are still alive are kept
    /// as-is and only the shortfall is allocated; this avoids registry
    /// churn for transient textures recreated every frame. Surplus live
    /// handles are freed, which requires their storage to be vacant.
    pub fn create_handles(
        &mut self,
        out: &mut Vec<TextureHandle>,
        count: usize,
        reuse_existing: bool,
    ) {
        if reuse_existing {
            out.retain(|h| self.records.contains(*h));
        } else {
            out.clear();
        }

        if out.len() > count {
            for handle in out.drain(count..) {
                if let Some(record) = self.records.free(handle) {
                    debug_assert!(
                        record.storage.active().is_none(),
                        "{} discarded with live storage",
                        handle
                    );
                }
            }
        }

        while out.len() < count {
            out.push(self.create_handle());
        }
    }

    /// Populates a reserved handle: allocates `copy_count` device
    /// resources behind it, computes its footprint and registers it under
    /// the named accounting group.
    pub fn allocate(
        &mut self,
        device: &mut dyn Device,
        handle: TextureHandle,
        desc: TextureDesc,
        copy_count: usize,
        group: &str,
    ) -> Result<()> {
        debug_assert!(copy_count >= 1);

        // Depth surfaces are never CPU-rewritten, so round-robin copies
        // would be pure waste; collapse them to one resource.
        let copy_count = if desc.format.is_depth() { 1 } else { copy_count };

        let storage = if desc.format.is_depth() {
            TextureStorage::DepthSurface(device.create_texture(&desc)?)
        } else if copy_count > 1 {
            let mut copies = SmallVec::new();
            for _ in 0..copy_count {
                copies.push(device.create_texture(&desc)?);
            }
            TextureStorage::MultiCopy { copies, cursor: 0 }
        } else {
            TextureStorage::Simple(device.create_texture(&desc)?)
        };

        let bytes = desc.memory_bytes() * copy_count as u64;
        let key = self.touch_group(group);

        let record = self
            .records
            .get_mut(handle)
            .ok_or_else(|| Error::TextureHandleInvalid(handle))?;
        debug_assert!(
            record.storage.active().is_none(),
            "{} already has storage",
            handle
        );

        debug!(
            "texture {} '{}' {}x{} ({} bytes, group '{}')",
            handle, desc.debug_name, desc.width, desc.height, bytes, group
        );

        record.desc = desc;
        record.storage = storage;
        record.group = key;
        record.bytes = bytes;

        self.groups.get_mut(&key).unwrap().stats.global_bytes += bytes;
        Ok(())
    }

    /// Reserves a handle and allocates its storage in one step.
    pub fn create_texture(
        &mut self,
        device: &mut dyn Device,
        desc: TextureDesc,
        copy_count: usize,
        group: &str,
    ) -> Result<TextureHandle> {
        let handle = self.create_handle();
        match self.allocate(device, handle, desc, copy_count, group) {
            Ok(()) => Ok(handle),
            Err(e) => {
                self.records.free(handle);
                Err(e)
            }
        }
    }

    /// Destroys the record's device resources (all copies), subtracts its
    /// footprint from its group, clears any standard-slot cross-reference
    /// and frees the handle for reuse. Callers must unbind the handle from
    /// every unit first.
    pub fn delete(&mut self, device: &mut dyn Device, handle: TextureHandle) {
        debug_assert!(self.records.contains(handle), "double free of {}", handle);
        debug_assert_ne!(self.modify_cursor, Some(handle));

        let record = match self.records.free(handle) {
            Some(v) => v,
            None => return,
        };

        match record.storage {
            TextureStorage::Vacant => {}
            TextureStorage::Simple(id) | TextureStorage::DepthSurface(id) => {
                device.destroy_texture(id);
            }
            TextureStorage::MultiCopy { copies, .. } => {
                for id in copies {
                    device.destroy_texture(id);
                }
            }
        }

        if let Some(g) = self.groups.get_mut(&record.group) {
            g.stats.global_bytes = g.stats.global_bytes.saturating_sub(record.bytes);
        }

        for slot in self.std_slots.iter_mut() {
            if *slot == Some(handle) {
                *slot = None;
            }
        }
    }

    /// Moves a record into the named accounting group, adjusting both
    /// groups' global counters.
    pub fn setup_texture_group(&mut self, handle: TextureHandle, group: &str) -> Result<()> {
        let key = self.touch_group(group);

        let record = self
            .records
            .get_mut(handle)
            .ok_or_else(|| Error::TextureHandleInvalid(handle))?;

        if record.group == key {
            return Ok(());
        }

        let old = record.group;
        let bytes = record.bytes;
        record.group = key;

        if let Some(g) = self.groups.get_mut(&old) {
            g.stats.global_bytes = g.stats.global_bytes.saturating_sub(bytes);
        }
        self.groups.get_mut(&key).unwrap().stats.global_bytes += bytes;
        Ok(())
    }

    /// Updates the per-texture sampler configuration stored on the record.
    pub fn set_sampler(&mut self, handle: TextureHandle, sampler: SamplerParams) -> Result<()> {
        let record = self
            .records
            .get_mut(handle)
            .ok_or_else(|| Error::TextureHandleInvalid(handle))?;
        record.sampler = sampler;
        Ok(())
    }

    /// Cross-references `handle` as a well-known standard texture.
    pub fn set_std_texture(&mut self, slot: StdTexture, handle: Option<TextureHandle>) {
        self.std_slots[slot.slot()] = handle;
    }

    pub fn std_texture(&self, slot: StdTexture) -> Option<TextureHandle> {
        self.std_slots[slot.slot()]
    }

    /// Resolves a bind of `handle` to a device resource, charging the
    /// frame accounting. Returns `None` (meaning "disable texturing") for vacant
    /// storage or when the bind would push the group's frame bytes past
    /// the configured budget.
    pub fn note_bind(&mut self, handle: TextureHandle) -> Option<DeviceTextureId> {
        let (id, group, bytes, first_bind) = {
            let record = self.records.get(handle)?;
            let id = record.storage.active()?;
            (id, record.group, record.bytes, record.times_bound_frame == 0)
        };

        if first_bind {
            let limit = self.frame_budget;
            let group = self.groups.get_mut(&group)?;
            if let Some(limit) = limit {
                if group.stats.frame_bytes + bytes > limit {
                    warn!(
                        "frame texture budget exceeded binding {}; disabling the unit",
                        handle
                    );
                    return None;
                }
            }
            group.stats.frame_bytes += bytes;
        }

        let record = self.records.get_mut(handle)?;
        record.times_bound_frame += 1;
        record.max_times_bound = record.max_times_bound.max(record.times_bound_frame);
        Some(id)
    }

    /// Locks `handle` for modification, advancing the round-robin cursor
    /// of multi-copy storage so the copy about to be written is not the
    /// one stale binds still reference. The cursor is released when the
    /// returned token is dropped.
    pub(crate) fn begin_modify(&mut self, handle: TextureHandle) -> Result<DeviceTextureId> {
        if self.modify_cursor.is_some() {
            return Err(Error::ModifyInProgress);
        }

        let record = self
            .records
            .get_mut(handle)
            .ok_or_else(|| Error::TextureHandleInvalid(handle))?;

        record.storage.advance();
        let id = record
            .storage
            .active()
            .ok_or_else(|| Error::TextureNotAllocated(handle))?;

        self.modify_cursor = Some(handle);
        Ok(id)
    }

    pub(crate) fn end_modify(&mut self, handle: TextureHandle) {
        debug_assert_eq!(self.modify_cursor, Some(handle));
        self.modify_cursor = None;
    }

    /// Memory counters for the named group, if it was ever used.
    pub fn group_stats(&self, group: &str) -> Option<GroupStats> {
        self.groups.get(&group.into()).map(|g| g.stats)
    }

    /// Resets per-frame bind counters and per-frame group byte counters.
    pub fn advance_frame(&mut self) {
        for record in self.records.values_mut() {
            record.times_bound_frame = 0;
        }

        for group in self.groups.values_mut() {
            group.stats.frame_bytes = 0;
        }
    }

    fn touch_group(&mut self, name: &str) -> HashValue<str> {
        let key: HashValue<str> = name.into();
        self.groups.entry(key).or_insert_with(|| {
            info!("texture group '{}' created", name);
            TextureGroup {
                name: name.to_string(),
                stats: GroupStats::default(),
            }
        });
        key
    }

    /// Names of all known accounting groups.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.values().map(|g| g.name.as_str())
    }
}

/// A scoped modification token. Holding it pins the registry's "currently
/// being written" cursor to one handle; dropping it releases the cursor,
/// so mismatched lock/unlock sequences cannot happen.
pub struct ModifyScope<'a, D: Device> {
    registry: &'a mut TextureRegistry,
    device: &'a mut D,
    handle: TextureHandle,
    target: DeviceTextureId,
}

impl<'a, D: Device> ModifyScope<'a, D> {
    pub(crate) fn new(
        registry: &'a mut TextureRegistry,
        device: &'a mut D,
        handle: TextureHandle,
        target: DeviceTextureId,
    ) -> Self {
        ModifyScope {
            registry,
            device,
            handle,
            target,
        }
    }

    /// The device resource writes will land in.
    pub fn target(&self) -> DeviceTextureId {
        self.target
    }

    /// Uploads `bytes` into one mip level of the locked copy.
    pub fn upload(&mut self, level: u8, bytes: &[u8]) -> Result<()> {
        self.device.update_texture(self.target, level, bytes)
    }
}

impl<'a, D: Device> Drop for ModifyScope<'a, D> {
    fn drop(&mut self) {
        self.registry.end_modify(self.handle);
    }
}
