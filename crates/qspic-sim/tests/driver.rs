//! Driver integration tests against the simulated controller

use qspic_core::addr::{ControllerId, MEM1_BASE, MEM2_BASE, WINDOW_SIZE};
use qspic_core::bus::{AccessMode, BusMode, ClkDiv, QspiBus};
use qspic_core::clock::SysClk;
use qspic_core::device::families;
use qspic_core::driver::{DetectPolicy, DriverConfig, ErasePolicy, PowerPolicy, QspiDriver};
use qspic_sim::SimBus;

const W25Q128_JEDEC: [u8; 3] = [0xEF, 0x40, 0x18];
const W25Q256_JEDEC: [u8; 3] = [0xEF, 0x80, 0x19];
const APS6404_JEDEC: [u8; 3] = [0x0D, 0x5D, 0x46];

const FLASH_SIZE: usize = 16 * 1024 * 1024;
const FLASH_BIG_SIZE: usize = 32 * 1024 * 1024;
const RAM_SIZE: usize = 8 * 1024 * 1024;

const SECTOR: u32 = 4096;

fn init_driver(bus1: SimBus, bus2: SimBus, cfg: DriverConfig) -> QspiDriver<SimBus> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut drv = QspiDriver::new(bus1, bus2, cfg);
    drv.init(SysClk::Xtal32M);
    drv
}

fn flash_only() -> QspiDriver<SimBus> {
    init_driver(
        SimBus::flash(W25Q128_JEDEC, FLASH_SIZE),
        SimBus::absent(),
        DriverConfig::default(),
    )
}

fn flash_and_ram() -> QspiDriver<SimBus> {
    init_driver(
        SimBus::flash(W25Q128_JEDEC, FLASH_SIZE),
        SimBus::psram(APS6404_JEDEC, RAM_SIZE),
        DriverConfig::default(),
    )
}

#[test]
fn test_autodetect_binds_registry_entry() {
    let drv = flash_only();

    assert!(drv.is_present(ControllerId::Qspic1));
    assert!(!drv.is_present(ControllerId::Qspic2));
    assert!(!drv.is_ram_device(ControllerId::Qspic1));

    // 128 Mbit -> 16 MiB
    assert_eq!(drv.device_size(ControllerId::Qspic1), Some(16 * 1024 * 1024));
    assert_eq!(drv.device_size(ControllerId::Qspic2), None);

    let id = drv.jedec_config(ControllerId::Qspic1).unwrap();
    assert_eq!(
        (id.manufacturer, id.device_type, id.density),
        (0xEF, 0x40, 0x18)
    );
}

#[test]
fn test_init_leaves_auto_mode_quad_framing() {
    let drv = flash_only();
    let bus = drv.bus(ControllerId::Qspic1);
    assert_eq!(bus.access_mode(), AccessMode::Auto);
    assert_eq!(bus.bus_mode(), BusMode::Quad);
    assert!(bus.clock_enabled());
}

#[test]
fn test_quad_disabled_leaves_single_framing() {
    let cfg = DriverConfig {
        quad_enabled: false,
        ..DriverConfig::default()
    };
    let drv = init_driver(SimBus::flash(W25Q128_JEDEC, FLASH_SIZE), SimBus::absent(), cfg);
    assert!(drv.is_present(ControllerId::Qspic1));
    assert_eq!(drv.bus(ControllerId::Qspic1).bus_mode(), BusMode::Single);
}

#[test]
fn test_detection_falls_back_to_alternate_jedec_command() {
    let drv = init_driver(
        SimBus::flash(W25Q128_JEDEC, FLASH_SIZE).with_alt_jedec_only(),
        SimBus::absent(),
        DriverConfig::default(),
    );
    assert!(drv.is_present(ControllerId::Qspic1));
}

#[test]
fn test_unknown_device_marks_controller_absent() {
    let drv = init_driver(
        SimBus::flash([0xAA, 0xBB, 0xCC], FLASH_SIZE),
        SimBus::absent(),
        DriverConfig::default(),
    );
    assert!(!drv.is_present(ControllerId::Qspic1));
    // Absent controllers get their clock gated and fail validation
    assert!(!drv.bus(ControllerId::Qspic1).clock_enabled());
    assert!(!drv.is_valid_addr(MEM1_BASE));
}

#[test]
fn test_address_validation() {
    let drv = flash_and_ram();

    assert!(!drv.is_valid_addr(MEM1_BASE - 1));
    assert!(drv.is_valid_addr(MEM1_BASE));
    assert!(drv.is_valid_addr(MEM1_BASE + FLASH_SIZE as u32 - 1));
    // Beyond the bound device's capacity, inside the hardware window
    assert!(!drv.is_valid_addr(MEM1_BASE + FLASH_SIZE as u32));

    assert!(drv.is_valid_addr(MEM2_BASE));
    assert!(drv.is_valid_addr(MEM2_BASE + RAM_SIZE as u32 - 1));
    assert!(!drv.is_valid_addr(MEM2_BASE + RAM_SIZE as u32));
    assert!(!drv.is_valid_addr(MEM2_BASE + WINDOW_SIZE));
}

#[test]
fn test_address_validation_rejects_absent_window() {
    let drv = flash_only();
    assert!(!drv.is_valid_addr(MEM2_BASE));
    assert!(!drv.is_valid_addr(MEM2_BASE + 4));
}

#[test]
fn test_write_page_stops_at_page_boundary() {
    let mut drv = flash_only();
    let addr = MEM1_BASE + 0x1F0;
    let data = [0x5Au8; 32];

    // Page boundary at 0x200: only 16 bytes of 32 fit
    let written = drv.write_page(addr, &data);
    assert_eq!(written, 16);

    // The caller finishes the request with a second call
    let written = drv.write_page(addr + 16, &data[16..]);
    assert_eq!(written, 16);

    let mut back = [0u8; 32];
    drv.read(addr, &mut back);
    assert_eq!(back, data);
}

#[test]
fn test_write_page_respects_max_write_size() {
    let cfg = DriverConfig {
        max_write_size: 32,
        ..DriverConfig::default()
    };
    let mut drv = init_driver(SimBus::flash(W25Q128_JEDEC, FLASH_SIZE), SimBus::absent(), cfg);

    let data = [0x11u8; 100];
    let written = drv.write_page(MEM1_BASE, &data);
    assert_eq!(written, 32);
}

#[test]
fn test_programming_only_clears_bits() {
    let mut drv = flash_only();
    let addr = MEM1_BASE + 0x3000;

    assert_eq!(drv.write_page(addr, &[0xF0]), 1);
    // Without an erase in between, the second write can only clear bits
    assert_eq!(drv.write_page(addr, &[0x0F]), 1);

    let mut back = [0u8; 1];
    drv.read(addr, &mut back);
    assert_eq!(back[0], 0xF0 & 0x0F);
}

#[test]
fn test_write_twice_is_bitwise_and() {
    let mut drv = flash_only();
    let addr = MEM1_BASE + 0x4000;
    let first = [0xDE, 0xAD, 0xBE, 0xEF];
    let second = [0xCA, 0xFE, 0x12, 0x34];

    drv.write_page(addr, &first);
    drv.write_page(addr, &second);

    let mut back = [0u8; 4];
    drv.read(addr, &mut back);
    for i in 0..4 {
        assert_eq!(back[i], first[i] & second[i]);
    }
}

#[test]
fn test_erase_sector_restores_erased_value() {
    let mut drv = flash_only();
    let sector_addr = MEM1_BASE + 2 * SECTOR;

    drv.write_page(sector_addr + 7, &[0x00; 64]);
    drv.erase_sector(sector_addr);

    let mut back = vec![0u8; SECTOR as usize];
    drv.read(sector_addr, &mut back);
    assert!(back.iter().all(|&b| b == 0xFF));
}

#[test]
fn test_erase_sector_manual_policy() {
    let cfg = DriverConfig {
        erase_policy: ErasePolicy::Manual,
        ..DriverConfig::default()
    };
    let mut drv = init_driver(
        SimBus::flash(W25Q128_JEDEC, FLASH_SIZE).with_busy_polls(3),
        SimBus::absent(),
        cfg,
    );
    let sector_addr = MEM1_BASE + 5 * SECTOR;

    drv.write_page(sector_addr, &[0xA5; 16]);
    drv.erase_sector(sector_addr);

    let mut back = vec![0u8; SECTOR as usize];
    drv.read(sector_addr, &mut back);
    assert!(back.iter().all(|&b| b == 0xFF));
    // Back in auto mode after the manual window
    assert_eq!(drv.bus(ControllerId::Qspic1).access_mode(), AccessMode::Auto);
}

#[test]
fn test_write_completes_with_slow_device() {
    let mut drv = init_driver(
        SimBus::flash(W25Q128_JEDEC, FLASH_SIZE).with_busy_polls(5),
        SimBus::absent(),
        DriverConfig::default(),
    );
    let data = [0x42u8; 64];
    assert_eq!(drv.write_page(MEM1_BASE + 0x100, &data), 64);

    let mut back = [0u8; 64];
    drv.read(MEM1_BASE + 0x100, &mut back);
    assert_eq!(back, data);
}

#[test]
fn test_erase_chip_by_id_refuses_absent_without_bus_activity() {
    let mut drv = flash_only();
    let before = drv.bus(ControllerId::Qspic2).transfers;
    assert!(!drv.erase_chip_by_id(ControllerId::Qspic2));
    assert_eq!(drv.bus(ControllerId::Qspic2).transfers, before);
}

#[test]
fn test_erase_chip_by_id_refuses_ram_without_bus_activity() {
    let mut drv = flash_and_ram();
    let before = drv.bus(ControllerId::Qspic2).transfers;
    assert!(!drv.erase_chip_by_id(ControllerId::Qspic2));
    assert_eq!(drv.bus(ControllerId::Qspic2).transfers, before);
}

#[test]
fn test_erase_chip_erases_flash_and_skips_ram() {
    let mut ram = SimBus::psram(APS6404_JEDEC, RAM_SIZE);
    ram.mem_mut()[..4].copy_from_slice(&[0x11, 0x22, 0x33, 0x44]);

    let mut drv = init_driver(
        SimBus::flash(W25Q128_JEDEC, FLASH_SIZE),
        ram,
        DriverConfig::default(),
    );

    drv.write_page(MEM1_BASE + 0x100, &[0x00; 16]);
    assert!(drv.erase_chip_by_id(ControllerId::Qspic1));
    assert!(!drv.erase_chip_by_id(ControllerId::Qspic2));
    drv.erase_chip();

    let mut back = [0u8; 16];
    drv.read(MEM1_BASE + 0x100, &mut back);
    assert!(back.iter().all(|&b| b == 0xFF));

    // RAM contents survived
    let mut ram_back = [0u8; 4];
    drv.read(MEM2_BASE, &mut ram_back);
    assert_eq!(ram_back, [0x11, 0x22, 0x33, 0x44]);
}

#[test]
#[should_panic]
fn test_ram_device_on_first_controller_asserts() {
    init_driver(
        SimBus::psram(APS6404_JEDEC, RAM_SIZE),
        SimBus::absent(),
        DriverConfig::default(),
    );
}

#[test]
#[should_panic]
fn test_write_to_unmapped_address_asserts() {
    let mut drv = flash_only();
    drv.write_page(MEM2_BASE, &[0u8; 4]);
}

#[test]
fn test_static_config_binds_without_probe() {
    let cfg = DriverConfig {
        detect: [
            DetectPolicy::Static {
                config: &families::W25Q256JW,
                verify: false,
            },
            DetectPolicy::Unused,
        ],
        ..DriverConfig::default()
    };
    let mut drv = init_driver(
        SimBus::flash(W25Q256_JEDEC, FLASH_BIG_SIZE),
        SimBus::absent(),
        cfg,
    );

    assert!(drv.is_present(ControllerId::Qspic1));
    assert_eq!(drv.device_size(ControllerId::Qspic1), Some(32 * 1024 * 1024));

    // 32-bit addressing: program and read back above 16 MiB
    let high = MEM1_BASE + 17 * 1024 * 1024;
    assert_eq!(drv.write_page(high, &[0x77; 8]), 8);
    let mut back = [0u8; 8];
    drv.read(high, &mut back);
    assert_eq!(back, [0x77; 8]);
}

#[test]
fn test_static_config_verify_mismatch_forces_absent() {
    let cfg = DriverConfig {
        detect: [
            DetectPolicy::Static {
                config: &families::W25Q256JW,
                verify: true,
            },
            DetectPolicy::Unused,
        ],
        ..DriverConfig::default()
    };
    // A different part answers the probe
    let drv = init_driver(SimBus::flash(W25Q128_JEDEC, FLASH_SIZE), SimBus::absent(), cfg);
    assert!(!drv.is_present(ControllerId::Qspic1));
}

#[test]
fn test_static_config_verify_match_binds() {
    let cfg = DriverConfig {
        detect: [
            DetectPolicy::Static {
                config: &families::W25Q256JW,
                verify: true,
            },
            DetectPolicy::Unused,
        ],
        ..DriverConfig::default()
    };
    let drv = init_driver(
        SimBus::flash(W25Q256_JEDEC, FLASH_BIG_SIZE),
        SimBus::absent(),
        cfg,
    );
    assert!(drv.is_present(ControllerId::Qspic1));
}

#[test]
fn test_ram_gets_auto_write_instruction_flash_does_not() {
    let drv = flash_and_ram();
    assert_eq!(drv.bus(ControllerId::Qspic1).save_config().auto_write_cmd, 0);
    assert_ne!(drv.bus(ControllerId::Qspic2).save_config().auto_write_cmd, 0);
}

#[test]
fn test_power_cycle_restores_configuration() {
    let cfg = DriverConfig {
        power_policy: PowerPolicy::PowerDown,
        ..DriverConfig::default()
    };
    let mut drv = init_driver(
        SimBus::flash(W25Q128_JEDEC, FLASH_SIZE),
        SimBus::psram(APS6404_JEDEC, RAM_SIZE),
        cfg,
    );

    drv.write_page(MEM1_BASE, &[0x3C; 8]);
    let snapshot = drv.bus(ControllerId::Qspic1).save_config();

    drv.power_down();
    assert!(!drv.bus(ControllerId::Qspic1).clock_enabled());
    assert!(!drv.bus(ControllerId::Qspic2).clock_enabled());
    assert!(drv.bus(ControllerId::Qspic1).is_powered_down());
    // RAM keeps state and is never sent to power-down
    assert!(!drv.bus(ControllerId::Qspic2).is_powered_down());

    drv.power_up();
    assert!(drv.bus(ControllerId::Qspic1).clock_enabled());
    assert!(!drv.bus(ControllerId::Qspic1).is_powered_down());
    assert_eq!(drv.bus(ControllerId::Qspic1).access_mode(), AccessMode::Auto);
    assert_eq!(drv.bus(ControllerId::Qspic1).save_config(), snapshot);

    // Memory is readable again
    let mut back = [0u8; 8];
    drv.read(MEM1_BASE, &mut back);
    assert_eq!(back, [0x3C; 8]);
}

#[test]
fn test_power_cycle_with_power_off_reinitializes() {
    let cfg = DriverConfig {
        power_policy: PowerPolicy::PowerOff,
        ..DriverConfig::default()
    };
    let mut drv = init_driver(SimBus::flash(W25Q128_JEDEC, FLASH_SIZE), SimBus::absent(), cfg);

    drv.power_down();
    drv.power_up();

    assert_eq!(drv.bus(ControllerId::Qspic1).access_mode(), AccessMode::Auto);
    let mut back = [0u8; 4];
    drv.read(MEM1_BASE, &mut back);
    assert_eq!(back, [0xFF; 4]);
}

#[test]
fn test_sys_clock_cfg_rescales_timings() {
    let mut drv = flash_and_ram();

    // At 32 MHz the PSRAM chip-select limit is 2us * 32 cycles/us
    assert_eq!(drv.bus(ControllerId::Qspic2).cs_active_max(), 64);

    drv.sys_clock_cfg(SysClk::Pll96);
    assert_eq!(drv.bus(ControllerId::Qspic1).divider(), ClkDiv::Div2);
    assert_eq!(drv.bus(ControllerId::Qspic2).divider(), ClkDiv::Div2);
    // 2us at 96 MHz divided by 2
    assert_eq!(drv.bus(ControllerId::Qspic2).cs_active_max(), 96);

    drv.sys_clock_cfg(SysClk::Xtal32M);
    assert_eq!(drv.bus(ControllerId::Qspic1).divider(), ClkDiv::Div1);
    assert_eq!(drv.bus(ControllerId::Qspic2).cs_active_max(), 64);
}

#[test]
fn test_snapshot_roundtrip_is_bit_exact() {
    let mut drv = flash_only();
    let saved = drv.bus(ControllerId::Qspic1).save_config();
    assert_ne!(saved, Default::default());

    drv.power_down();
    drv.power_up();
    assert_eq!(drv.bus(ControllerId::Qspic1).save_config(), saved);
}
