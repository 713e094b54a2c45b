use crate::domain::slot::Slot;
use crate::domain::timetable::{RoomName, Snapshot, TeacherName};
use std::collections::{BTreeSet, HashMap, HashSet};

// ==========================================
// SlotUsage - 单个时间槽的占用情况
// ==========================================
#[derive(Debug, Default)]
struct SlotUsage<'a> {
    groups: HashSet<&'a str>,
    teachers: HashSet<&'a TeacherName>,
    rooms: HashSet<&'a RoomName>,
}

// ==========================================
// SlotOccupancy - 快照占用索引
// ==========================================
// 一次构建, 多次查询; 生命周期绑定只读快照
#[derive(Debug, Default)]
pub struct SlotOccupancy<'a> {
    slots: HashMap<Slot, SlotUsage<'a>>,
    // (周次, 星期) → 组名 → 已占用节次
    group_days: HashMap<(u32, u8), HashMap<&'a str, BTreeSet<u8>>>,
    // 快照中出现过的全部教室
    known_rooms: BTreeSet<&'a RoomName>,
}

impl<'a> SlotOccupancy<'a> {
    pub fn build(snapshot: &'a Snapshot) -> Self {
        let mut occupancy = SlotOccupancy::default();

        for week in &snapshot.weeks {
            for group in &week.groups {
                let group_name = group.group_name.as_str();
                for day in &group.days {
                    for lesson in &day.lessons {
                        let slot = Slot::new(week.week_number, day.weekday, lesson.time);
                        let usage = occupancy.slots.entry(slot).or_default();
                        usage.groups.insert(group_name);
                        usage.teachers.extend(lesson.teacher_names());
                        usage.rooms.extend(lesson.room_names());

                        occupancy.known_rooms.extend(lesson.room_names());
                        occupancy
                            .group_days
                            .entry((week.week_number, day.weekday))
                            .or_default()
                            .entry(group_name)
                            .or_default()
                            .insert(lesson.time);
                    }
                }
            }
        }

        occupancy
    }

    /// 组在该时间槽是否已有课
    pub fn group_busy(&self, slot: &Slot, group_name: &str) -> bool {
        self.slots
            .get(slot)
            .is_some_and(|u| u.groups.contains(group_name))
    }

    /// 教师在该时间槽是否已有课（任意组）
    pub fn teacher_busy(&self, slot: &Slot, teacher: &TeacherName) -> bool {
        self.slots
            .get(slot)
            .is_some_and(|u| u.teachers.contains(teacher))
    }

    /// 教室在该时间槽是否被占用（任意组）
    pub fn room_busy(&self, slot: &Slot, room: &RoomName) -> bool {
        self.slots
            .get(slot)
            .is_some_and(|u| u.rooms.contains(room))
    }

    /// 组在某周某天已占用的节次（升序）
    pub fn occupied_times(&self, week: u32, group_name: &str, weekday: u8) -> BTreeSet<u8> {
        self.group_days
            .get(&(week, weekday))
            .and_then(|groups| groups.get(group_name))
            .cloned()
            .unwrap_or_default()
    }

    /// 快照中出现过的全部教室（升序）
    pub fn known_rooms(&self) -> impl Iterator<Item = &'a RoomName> + '_ {
        self.known_rooms.iter().copied()
    }

    /// 该时间槽的空闲教室（升序）
    pub fn free_rooms(&self, slot: &Slot) -> impl Iterator<Item = &'a RoomName> + '_ {
        let busy = self.slots.get(slot).map(|u| &u.rooms);
        self.known_rooms
            .iter()
            .copied()
            .filter(move |room| busy.map_or(true, |b| !b.contains(*room)))
    }

    /// 同楼栋的空闲替代教室（升序, 不含原教室）
    ///
    /// 原教室名中不含分隔符时无法判定楼栋, 返回空
    pub fn same_building_free_rooms(
        &self,
        slot: &Slot,
        room: &RoomName,
        separator: char,
    ) -> Vec<&'a RoomName> {
        let Some(building) = room.building(separator) else {
            return Vec::new();
        };

        self.free_rooms(slot)
            .filter(|candidate| *candidate != room)
            .filter(|candidate| candidate.building(separator) == Some(building))
            .collect()
    }
}
