use crate::config::EngineConfig;
use crate::domain::slot::{count_windows, Slot};
use crate::domain::timetable::{RoomName, TeacherName};
use crate::engine::overlap::SlotOccupancy;
use crate::i18n::t_in;

// ==========================================
// 评分输入 / 输出
// ==========================================

/// 待调课程的固定属性
pub(super) struct MoveContext<'c> {
    pub config: &'c EngineConfig,
    pub group_name: &'c str,
    pub teacher: Option<&'c TeacherName>,
    pub room: Option<&'c RoomName>,
    pub current: Slot,
}

#[derive(Debug)]
pub(super) struct SlotScore {
    pub total: i32,
    pub room: Option<RoomName>,
    pub notes: Vec<String>,
}

/// 对单个候选时间槽评分
///
/// 评分项:
/// 1) 同周 / 同星期或相邻星期 / 相邻节次 加分
/// 2) 组被占用: 直接 0 分
/// 3) 教师被占用: 罚分
/// 4) 教室被占用: 同楼栋有空闲替代则加分, 否则罚分
/// 5) 目标日窗口节数（含本次放置）罚分
pub(super) fn score_slot(
    ctx: &MoveContext<'_>,
    occupancy: &SlotOccupancy<'_>,
    candidate: &Slot,
) -> SlotScore {
    let w = &ctx.config.weights;
    let locale = ctx.config.locale.as_str();
    let mut score = SlotScore {
        total: 0,
        room: ctx.room.cloned(),
        notes: Vec::new(),
    };

    if candidate.same_week(&ctx.current) {
        score.total += w.same_week;
    }
    if candidate.weekday == ctx.current.weekday {
        score.total += w.same_weekday;
    } else if candidate.weekday_adjacent(&ctx.current) {
        score.total += w.adjacent_weekday;
    }
    if candidate.time_adjacent(&ctx.current) {
        score.total += w.adjacent_time;
    }

    if occupancy.group_busy(candidate, ctx.group_name) {
        return SlotScore {
            total: 0,
            room: ctx.room.cloned(),
            notes: vec![t_in(locale, "transfer.group_busy", &[])],
        };
    }

    if let Some(teacher) = ctx.teacher {
        if occupancy.teacher_busy(candidate, teacher) {
            score.total += w.teacher_busy;
            score.notes.push(t_in(
                locale,
                "transfer.teacher_busy",
                &[("name", teacher.as_str())],
            ));
        }
    }

    if let Some(room) = ctx.room {
        let shared = ctx.config.ignored_rooms.contains(room);
        if !shared && occupancy.room_busy(candidate, room) {
            let substitutes =
                occupancy.same_building_free_rooms(candidate, room, ctx.config.building_separator);
            match substitutes.first() {
                Some(substitute) => {
                    score.room = Some((*substitute).clone());
                    score.total += w.room_substitute;
                }
                None => {
                    score.total += w.room_busy;
                    score.notes.push(t_in(
                        locale,
                        "transfer.room_busy",
                        &[("name", room.as_str())],
                    ));
                }
            }
        }
    }

    let mut day_times = occupancy.occupied_times(candidate.week, ctx.group_name, candidate.weekday);
    day_times.insert(candidate.time);
    let windows = count_windows(day_times);
    score.total += w.window.saturating_mul(i32::try_from(windows).unwrap_or(i32::MAX));

    score
}
