//! Integration tests for the immigration lifecycle
//!
//! These tests drive the controller against a sandbox colony:
//! - Offers are rolled, expire, and can be rejected
//! - Accepting commits costs and attraction claims, or changes nothing
//! - Persistent templates refill their slot until capped
//! - Competing offers never claim the same forge or recruit twice
//! - The built-in keeper roster recruits, teams and breeds as configured

use keep_immigration::collective::{Population, SandboxColony, StructureInventory};
use keep_immigration::core::config::{ImmigrationConfig, ImmigrationSettings};
use keep_immigration::core::types::{CandidateId, CostInfo, MinionTrait, Position, UnitId};
use keep_immigration::immigration::{
    AttractionInfo, AttractionKind, ExponentialCost, Group, ImmigrantTemplate, Immigration,
    ImmigrationEventType, RecruitmentInfo, Requirement, SpawnLocation,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn settings(timeout: f64) -> ImmigrationSettings {
    ImmigrationSettings {
        candidate_timeout: timeout,
        immigrant_frequency: 1.0,
        ..Default::default()
    }
}

fn colony() -> SandboxColony {
    let mut colony = SandboxColony::new(40, 40);
    colony.set_leader(Position::new(20, 20));
    colony.set_max_population(50);
    colony
}

fn only_id(immigration: &Immigration, colony: &SandboxColony, template: &str) -> CandidateId {
    let ids: Vec<CandidateId> = immigration
        .get_available(colony)
        .into_iter()
        .filter(|(_, view)| view.template.name == template)
        .map(|(id, _)| id)
        .collect();
    assert_eq!(ids.len(), 1, "expected exactly one {} offer", template);
    ids[0]
}

fn forge_goblin() -> ImmigrantTemplate {
    ImmigrantTemplate::new("goblin", "goblin", vec![MinionTrait::Fighter])
        .with_spawn_location(SpawnLocation::NearLeader)
        .with_requirement(Requirement::Attraction(AttractionInfo::new(
            1,
            vec![AttractionKind::structure("forge")],
        )))
}

fn imp(initial: u32) -> ImmigrantTemplate {
    ImmigrantTemplate::new("imp", "imp", vec![MinionTrait::Worker, MinionTrait::NoLimit])
        .persistent()
        .with_initial_recruitment(initial)
        .with_spawn_location(SpawnLocation::NearLeader)
        .with_requirement(Requirement::ExponentialCost(ExponentialCost::new(
            CostInfo::new("mana", 20),
            5,
            4,
        )))
}

fn elf_recruit() -> ImmigrantTemplate {
    let info = RecruitmentInfo {
        faction: "dark_elves".into(),
        min_population: 0,
        recruit_trait: MinionTrait::Fighter,
    };
    ImmigrantTemplate::new("elf", "dark_elf", vec![MinionTrait::Fighter])
        .with_preliminary_requirement(Requirement::Recruitment(info))
        .with_requirement(Requirement::Cost(CostInfo::new("gold", 100)))
}

fn elf_ally(colony: &mut SandboxColony) -> Vec<UnitId> {
    colony.add_faction("dark_elves", "Dark elves");
    colony.discover_faction("dark_elves");
    (0..3)
        .map(|_| colony.add_faction_unit("dark_elves", "dark_elf", MinionTrait::Fighter))
        .collect()
}

#[test]
fn test_forge_attraction_scenario() {
    let config = ImmigrationConfig::new(settings(100.0), vec![forge_goblin()]);
    let mut immigration = Immigration::new(config).unwrap();
    let mut colony = colony();
    colony.build("forge", Position::new(1, 1));
    colony.build("forge", Position::new(3, 1));
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    assert!(immigration.missing_requirements_for_group(Group::new(0, 1), &colony).is_empty());

    immigration.update(&mut colony, &mut rng);
    let id = only_id(&immigration, &colony, "goblin");
    let joined = immigration.accept(id, &mut colony, &mut rng);

    assert_eq!(joined.len(), 1);
    let forge = AttractionKind::structure("forge");
    assert_eq!(immigration.available_for(&forge, &colony), 1);
    assert_eq!(immigration.ledger().holdings(joined[0]), &[(forge, 1)]);
}

#[test]
fn test_exponential_cost_scenario() {
    let config = ImmigrationConfig::new(settings(100.0), vec![imp(5)]);
    let mut immigration = Immigration::new(config).unwrap();
    let mut colony = colony();
    let mut rng = ChaCha8Rng::seed_from_u64(7);

    // Five free imps on the first tick
    immigration.update(&mut colony, &mut rng);
    assert_eq!(colony.members_of_kind("imp").len(), 5);

    let id = only_id(&immigration, &colony, "imp");
    let view_cost = immigration.get_available(&colony)[&id].cost.clone();
    assert_eq!(view_cost, Some(CostInfo::new("mana", 20)));
    assert_eq!(
        immigration.missing_requirements(id, &colony, &mut rng),
        vec!["Not enough mana".to_string()]
    );

    colony.add_resource("mana", 1000);
    for _ in 0..4 {
        assert_eq!(immigration.accept(id, &mut colony, &mut rng).len(), 1);
    }

    // 20 + 23 + 28 + 33
    assert_eq!(colony.resource("mana"), 1000 - 104);
    assert_eq!(colony.members_of_kind("imp").len(), 9);
    let view_cost = immigration.get_available(&colony)[&id].cost.clone();
    assert_eq!(view_cost, Some(CostInfo::new("mana", 40)));

    // Dead imps stop counting
    for unit in colony.members_of_kind("imp").into_iter().take(4) {
        colony.kill(unit);
        immigration.on_unit_removed(unit);
    }
    let view_cost = immigration.get_available(&colony)[&id].cost.clone();
    assert_eq!(view_cost, Some(CostInfo::new("mana", 20)));
}

#[test]
fn test_expiry_scenario() {
    let config = ImmigrationConfig::new(settings(10.0), vec![forge_goblin()]);
    let mut immigration = Immigration::new(config).unwrap();
    let mut colony = colony();
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    colony.set_time(100.0);
    immigration.update(&mut colony, &mut rng);
    let id = only_id(&immigration, &colony, "goblin");
    immigration.drain_events();

    colony.set_time(110.0);
    assert!(immigration.get_available(&colony).contains_key(&id));

    colony.set_time(111.0);
    assert!(!immigration.get_available(&colony).contains_key(&id));
    immigration.update(&mut colony, &mut rng);

    let events = immigration.drain_events();
    assert!(events
        .iter()
        .any(|e| e.candidate == id && e.event_type == ImmigrationEventType::Expired));
    assert!(immigration.candidate(id).is_none());
    assert!(!immigration.get_available(&colony).contains_key(&id));
}

#[test]
fn test_no_positions_scenario() {
    let template = ImmigrantTemplate::new("zombie", "zombie", vec![MinionTrait::Fighter])
        .with_spawn_location(SpawnLocation::Structure("grave".into()))
        .with_requirement(Requirement::Cost(CostInfo::new("corpse", 1)));
    let config = ImmigrationConfig::new(settings(100.0), vec![template]);
    let mut immigration = Immigration::new(config).unwrap();
    let mut colony = colony();
    colony.add_resource("corpse", 2);
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    immigration.update(&mut colony, &mut rng);
    let id = only_id(&immigration, &colony, "zombie");

    assert_eq!(
        immigration.missing_requirements(id, &colony, &mut rng),
        vec!["Not enough room to spawn.".to_string()]
    );
    assert!(immigration.accept(id, &mut colony, &mut rng).is_empty());
    assert_eq!(colony.resource("corpse"), 2);
    assert_eq!(colony.member_count(), 0);
    assert!(immigration.candidate(id).is_some());

    // Digging a grave makes room
    colony.build("grave", Position::new(5, 5));
    assert_eq!(immigration.accept(id, &mut colony, &mut rng).len(), 1);
    assert_eq!(colony.resource("corpse"), 1);
}

#[test]
fn test_reject_twice_expires_once() {
    let config = ImmigrationConfig::new(settings(100.0), vec![forge_goblin()]);
    let mut immigration = Immigration::new(config).unwrap();
    let mut colony = colony();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    immigration.update(&mut colony, &mut rng);
    let id = only_id(&immigration, &colony, "goblin");
    immigration.drain_events();

    immigration.reject(id);
    immigration.reject(id);
    immigration.reject(CandidateId(999));
    immigration.update(&mut colony, &mut rng);

    let expired = immigration
        .drain_events()
        .into_iter()
        .filter(|e| e.event_type == ImmigrationEventType::Expired)
        .count();
    assert_eq!(expired, 1);
    assert!(immigration.accept(id, &mut colony, &mut rng).is_empty());
}

#[test]
fn test_accept_is_atomic() {
    let template = forge_goblin()
        .with_group_size(3, 3)
        .with_requirement(Requirement::Cost(CostInfo::new("gold", 10)));
    let config = ImmigrationConfig::new(settings(100.0), vec![template]);
    let mut immigration = Immigration::new(config).unwrap();
    let mut colony = colony();
    // The keeper stands on the spawn point; the group spreads around it
    colony.spawn_member_with_traits("keeper", Position::new(20, 20), vec![MinionTrait::Leader, MinionTrait::NoLimit]);
    colony.build("forge", Position::new(1, 1));
    colony.add_resource("gold", 100);
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    immigration.update(&mut colony, &mut rng);
    let id = only_id(&immigration, &colony, "goblin");

    assert_eq!(
        immigration.missing_requirements(id, &colony, &mut rng),
        vec!["Requires 2 more forges".to_string()]
    );
    assert!(immigration.accept(id, &mut colony, &mut rng).is_empty());

    assert_eq!(colony.resource("gold"), 100);
    assert_eq!(colony.member_count(), 1);
    assert_eq!(immigration.ledger().tracked_units(), 0);
    assert_eq!(immigration.history().total(0), 0);

    colony.build("forge", Position::new(2, 1));
    colony.build("forge", Position::new(3, 1));
    assert_eq!(immigration.accept(id, &mut colony, &mut rng).len(), 3);
    assert_eq!(colony.resource("gold"), 70);
    assert_eq!(immigration.available_for(&AttractionKind::structure("forge"), &colony), 0);
}

#[test]
fn test_persistent_slot_regenerates_until_limit() {
    let template = imp(0).with_limit(3);
    let config = ImmigrationConfig::new(settings(100.0), vec![template]);
    let mut immigration = Immigration::new(config).unwrap();
    let mut colony = colony();
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    immigration.update(&mut colony, &mut rng);
    let id = only_id(&immigration, &colony, "imp");
    immigration.reject(id);
    assert_eq!(immigration.candidate(id).unwrap().end_time, None);

    let mut previous: Vec<UnitId> = immigration.candidate(id).unwrap().unit_ids();
    for _ in 0..2 {
        let joined = immigration.accept(id, &mut colony, &mut rng);
        assert_eq!(joined, previous);
        assert_eq!(immigration.pool().len(), 1);
        let next = immigration.candidate(id).unwrap().unit_ids();
        assert_ne!(next, previous);
        previous = next;
    }

    assert_eq!(immigration.accept(id, &mut colony, &mut rng).len(), 1);
    assert!(immigration.candidate(id).is_none());
    assert_eq!(immigration.history().total(0), 3);
}

#[test]
fn test_auto_team_and_leader_bonus() {
    let template = ImmigrantTemplate::new("wolf", "wolf", vec![MinionTrait::Fighter])
        .with_group_size(4, 4)
        .with_auto_team();
    let config = ImmigrationConfig::new(settings(100.0), vec![template]);
    let mut immigration = Immigration::new(config).unwrap();
    let mut colony = colony();
    colony.set_territory((18..=22).flat_map(|y| (18..=22).map(move |x| Position::new(x, y))).collect());
    let mut rng = ChaCha8Rng::seed_from_u64(13);

    immigration.update(&mut colony, &mut rng);
    let id = only_id(&immigration, &colony, "wolf");
    let joined = immigration.accept(id, &mut colony, &mut rng);

    assert_eq!(joined.len(), 4);
    assert_eq!(colony.teams(), &[joined.clone()]);
    assert_eq!(colony.member(joined[0]).unwrap().experience, 2);
    for wolf in &joined[1..] {
        let member = colony.member(*wolf).unwrap();
        assert_eq!(member.experience, 0);
        assert!(member.has_trait(MinionTrait::Fighter));
        // Spawned in the band outside the territory
        assert!(member.position.distance(&Position::new(20, 20)) >= 12);
    }
}

#[test]
fn test_population_limit_respects_no_limit() {
    let config = ImmigrationConfig::new(settings(100.0), vec![imp(0), forge_goblin()]);
    let mut immigration = Immigration::new(config).unwrap();
    let mut colony = colony();
    colony.set_max_population(0);
    colony.build("forge", Position::new(1, 1));
    let mut rng = ChaCha8Rng::seed_from_u64(17);

    immigration.update(&mut colony, &mut rng);
    let imp_id = only_id(&immigration, &colony, "imp");
    let goblin_id = only_id(&immigration, &colony, "goblin");

    assert!(immigration.missing_requirements(imp_id, &colony, &mut rng).is_empty());
    assert_eq!(
        immigration.missing_requirements(goblin_id, &colony, &mut rng),
        vec!["Exceeds population limit".to_string()]
    );
}

#[test]
fn test_keeper_roster_initial_imps() {
    let mut immigration = Immigration::new(ImmigrationConfig::keeper().unwrap()).unwrap();
    let mut colony = SandboxColony::keeper_demo();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);

    immigration.update(&mut colony, &mut rng);

    let imps = colony.members_of_kind("imp");
    assert_eq!(imps.len(), 4);
    for unit in imps {
        let member = colony.member(unit).unwrap();
        assert!(member.has_trait(MinionTrait::NoLimit));
        assert_eq!(member.position.distance(&Position::new(32, 32)), 1);
    }
    assert_eq!(colony.resource("mana"), 600);
    assert_eq!(colony.population_size(), 0);

    // The imp and dark elf slots are always on offer
    let available = immigration.get_available(&colony);
    assert!(available.values().any(|view| view.template.name == "imp"));
    assert!(available.values().any(|view| view.template.name == "dark_elf_warrior"));
}

#[test]
fn test_dark_elf_recruitment_keeps_garrison() {
    let mut immigration = Immigration::new(ImmigrationConfig::keeper().unwrap()).unwrap();
    let mut colony = SandboxColony::keeper_demo();
    let mut rng = ChaCha8Rng::seed_from_u64(99);
    immigration.update(&mut colony, &mut rng);
    let id = only_id(&immigration, &colony, "dark_elf_warrior");
    assert!(immigration.candidate(id).unwrap().is_recruitment());

    let first = immigration.accept(id, &mut colony, &mut rng);
    assert_eq!(first.len(), 1);
    assert!(colony.is_member(first[0]));
    assert_eq!(colony.faction_size("dark_elves"), 4);
    assert_eq!(colony.resource("gold"), 250);

    let second = immigration.accept(id, &mut colony, &mut rng);
    assert_eq!(second.len(), 1);
    assert_eq!(colony.faction_size("dark_elves"), 3);
    assert_eq!(colony.resource("gold"), 100);

    // Three elves stay behind; the slot is empty and hidden
    assert!(immigration.candidate(id).unwrap().units().is_empty());
    assert!(!immigration.get_available(&colony).contains_key(&id));
    assert!(immigration.accept(id, &mut colony, &mut rng).is_empty());
}

#[test]
fn test_removed_recruit_is_dropped_from_offer() {
    let mut immigration = Immigration::new(ImmigrationConfig::keeper().unwrap()).unwrap();
    let mut colony = SandboxColony::keeper_demo();
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    immigration.update(&mut colony, &mut rng);
    let id = only_id(&immigration, &colony, "dark_elf_warrior");
    let recruit = immigration.candidate(id).unwrap().unit_ids()[0];

    colony.kill(recruit);
    immigration.on_unit_removed(recruit);
    assert!(immigration.candidate(id).unwrap().units().is_empty());

    // The next tick refills the slot with another elf
    colony.set_time(1.0);
    immigration.update(&mut colony, &mut rng);
    let refreshed = immigration.candidate(id).unwrap().unit_ids();
    assert_eq!(refreshed.len(), 1);
    assert_ne!(refreshed[0], recruit);
}

#[test]
fn test_mutant_consumes_pregnancy() {
    let mut config = ImmigrationConfig::keeper().unwrap();
    config.settings.immigrant_frequency = 1.0;
    config.immigrants.retain(|t| t.name == "humanoid_mutant");
    let mut immigration = Immigration::new(config).unwrap();
    let mut colony = colony();
    let mut rng = ChaCha8Rng::seed_from_u64(21);

    // Not rolled without a pregnant member
    colony.research("humanoid_mut");
    immigration.update(&mut colony, &mut rng);
    assert!(immigration.pool().is_empty());

    let mother = colony.spawn_member("succubus", Position::new(10, 10));
    colony.set_pregnant(mother, true);
    colony.add_resource("mana", 300);
    immigration.update(&mut colony, &mut rng);
    let id = only_id(&immigration, &colony, "humanoid_mutant");

    let joined = immigration.accept(id, &mut colony, &mut rng);

    assert_eq!(joined.len(), 1);
    let mutant = colony.member(joined[0]).unwrap();
    assert_eq!(mutant.kind.as_str(), "humanoid_mutant_bn");
    assert_eq!(mutant.position.distance(&Position::new(10, 10)), 1);
    assert!(!colony.is_pregnant(mother));
    assert_eq!(colony.resource("mana"), 50);
}

#[test]
fn test_same_seed_same_history() {
    let run = |seed: u64| {
        let mut immigration = Immigration::new(ImmigrationConfig::keeper().unwrap()).unwrap();
        let mut colony = SandboxColony::keeper_demo();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for tick in 0..2000u64 {
            colony.set_time(tick as f64);
            immigration.update(&mut colony, &mut rng);
            let ids: Vec<CandidateId> = immigration.get_available(&colony).keys().copied().collect();
            for id in ids {
                immigration.accept(id, &mut colony, &mut rng);
            }
        }
        (colony.units(), immigration.pool().iter().map(|(id, _)| id).collect::<Vec<_>>())
    };
    assert_eq!(run(77), run(77));
}

#[test]
fn test_snapshot_resumes_identically() {
    let mut immigration = Immigration::new(ImmigrationConfig::keeper().unwrap()).unwrap();
    let mut colony = SandboxColony::keeper_demo();
    let mut rng = ChaCha8Rng::seed_from_u64(31);
    for tick in 0..500u64 {
        colony.set_time(tick as f64);
        immigration.update(&mut colony, &mut rng);
    }

    let mut restored = Immigration::from_json(&immigration.to_json().unwrap()).unwrap();
    let mut colony_copy = colony.clone();
    let mut rng_copy = rng.clone();
    for tick in 500..1500u64 {
        colony.set_time(tick as f64);
        colony_copy.set_time(tick as f64);
        immigration.update(&mut colony, &mut rng);
        restored.update(&mut colony_copy, &mut rng_copy);
    }

    let original: Vec<CandidateId> = immigration.pool().iter().map(|(id, _)| id).collect();
    let resumed: Vec<CandidateId> = restored.pool().iter().map(|(id, _)| id).collect();
    assert_eq!(original, resumed);
    assert_eq!(colony.units(), colony_copy.units());
    assert_eq!(colony.built_count(&"forge".into()), colony_copy.built_count(&"forge".into()));
}

#[test]
fn test_competing_offers_share_one_forge() {
    let config = ImmigrationConfig::new(settings(100.0), vec![forge_goblin()]);
    let mut immigration = Immigration::new(config).unwrap();
    let mut colony = colony();
    colony.build("forge", Position::new(1, 1));
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    immigration.update(&mut colony, &mut rng);
    immigration.update(&mut colony, &mut rng);
    let ids: Vec<CandidateId> = immigration.get_available(&colony).keys().copied().collect();
    assert_eq!(ids.len(), 2);

    // Each offer alone fits the single forge
    for id in &ids {
        assert!(immigration.missing_requirements(*id, &colony, &mut rng).is_empty());
    }
    assert_eq!(immigration.accept(ids[0], &mut colony, &mut rng).len(), 1);

    assert_eq!(
        immigration.missing_requirements(ids[1], &colony, &mut rng),
        vec!["Requires 1 more forge".to_string()]
    );
    assert!(immigration.accept(ids[1], &mut colony, &mut rng).is_empty());
    assert_eq!(colony.member_count(), 1);
    assert_eq!(immigration.ledger().tracked_units(), 1);
    assert_eq!(immigration.history().total(0), 1);
    assert!(immigration.candidate(ids[1]).is_some());
}

#[test]
fn test_recruit_joins_only_once() {
    let config = ImmigrationConfig::new(settings(100.0), vec![elf_recruit()]);
    let mut immigration = Immigration::new(config).unwrap();
    let mut colony = colony();
    let elves = elf_ally(&mut colony);
    colony.add_resource("gold", 1000);
    let mut rng = ChaCha8Rng::seed_from_u64(31);
    immigration.update(&mut colony, &mut rng);
    immigration.update(&mut colony, &mut rng);
    let ids: Vec<CandidateId> = immigration.get_available(&colony).keys().copied().collect();
    assert_eq!(ids.len(), 2);
    for id in &ids {
        assert_eq!(immigration.candidate(*id).unwrap().unit_ids(), vec![elves[0]]);
    }

    assert_eq!(immigration.accept(ids[0], &mut colony, &mut rng), vec![elves[0]]);

    // The other offer lost its elf and is hidden
    assert!(immigration.candidate(ids[1]).unwrap().units().is_empty());
    assert!(!immigration.get_available(&colony).contains_key(&ids[1]));
    assert!(immigration.accept(ids[1], &mut colony, &mut rng).is_empty());
    assert_eq!(colony.resource("gold"), 900);
    assert_eq!(immigration.history().total(0), 1);
    assert_eq!(colony.faction_size("dark_elves"), 2);
    assert_eq!(colony.member_count(), 1);
}

#[test]
fn test_recruit_taken_elsewhere_is_refused() {
    let config = ImmigrationConfig::new(settings(100.0), vec![elf_recruit()]);
    let mut immigration = Immigration::new(config).unwrap();
    let mut colony = colony();
    let elves = elf_ally(&mut colony);
    colony.add_resource("gold", 1000);
    let mut rng = ChaCha8Rng::seed_from_u64(32);
    immigration.update(&mut colony, &mut rng);
    let id = only_id(&immigration, &colony, "elf");

    // The elf leaves its faction without the controller hearing about it
    colony.enlist_recruit(elves[0], &[MinionTrait::Fighter]);

    assert_eq!(
        immigration.missing_requirements(id, &colony, &mut rng),
        vec!["Recruit is no longer available.".to_string()]
    );
    assert!(immigration.accept(id, &mut colony, &mut rng).is_empty());
    assert_eq!(colony.resource("gold"), 1000);
    assert_eq!(immigration.history().total(0), 0);
    assert_eq!(colony.faction_size("dark_elves"), 2);
}
